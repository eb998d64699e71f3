//! Inventory reader trait and implementations.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::ClusterInfo;

/// Read access to the external virtualization inventory.
#[async_trait]
pub trait InventoryReader: Send + Sync {
    /// List every cluster, with its hosts, visible under `scope`.
    ///
    /// Must not mutate anything. Failures are reported as
    /// [`Error::InventoryRead`].
    async fn list_clusters_and_hosts(&self, scope: &str) -> Result<Vec<ClusterInfo>>;
}

/// Reader serving snapshots set in memory.
#[derive(Default)]
pub struct StaticInventoryReader {
    snapshots: RwLock<HashMap<String, Vec<ClusterInfo>>>,
}

impl StaticInventoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot served for `scope`.
    pub async fn set(&self, scope: impl Into<String>, clusters: Vec<ClusterInfo>) {
        self.snapshots.write().await.insert(scope.into(), clusters);
    }

    /// Stop serving `scope`; reads for it fail afterwards.
    pub async fn remove(&self, scope: &str) {
        self.snapshots.write().await.remove(scope);
    }
}

#[async_trait]
impl InventoryReader for StaticInventoryReader {
    async fn list_clusters_and_hosts(&self, scope: &str) -> Result<Vec<ClusterInfo>> {
        self.snapshots
            .read()
            .await
            .get(scope)
            .cloned()
            .ok_or_else(|| Error::inventory_read(scope, "unknown credential scope"))
    }
}

/// Reader loading a scope → clusters document from disk on every call.
///
/// The file maps scope names to cluster lists; JSON, YAML or TOML by
/// extension.
#[derive(Debug, Clone)]
pub struct FileInventoryReader {
    path: PathBuf,
}

impl FileInventoryReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InventoryReader for FileInventoryReader {
    async fn list_clusters_and_hosts(&self, scope: &str) -> Result<Vec<ClusterInfo>> {
        let path = self.path.clone();
        let mut document = tokio::task::spawn_blocking(move || {
            vmigrate_core::load_document::<BTreeMap<String, Vec<ClusterInfo>>>(&path)
        })
        .await
        .map_err(|e| Error::inventory_read(scope, e.to_string()))?
        .map_err(|e| Error::inventory_read(scope, e.to_string()))?;

        document
            .remove(scope)
            .ok_or_else(|| Error::inventory_read(scope, "scope not present in inventory file"))
    }
}
