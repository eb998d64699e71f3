//! Object store trait and implementations.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{ManagedObject, ObjectKind, ObjectRef};

/// Declarative store holding managed cluster and host objects.
///
/// Each [`ObjectKind`] is a separate key space, keyed by the derived
/// identifier. `create` on an existing key and `update`/`delete` on a missing
/// key fail with [`Error::StoreConflict`]; they are never silent no-ops.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one object.
    async fn get(&self, kind: ObjectKind, key: &str) -> Result<Option<ManagedObject>>;

    /// List every object of `kind` belonging to `scope`.
    async fn list(&self, kind: ObjectKind, scope: &str) -> Result<Vec<ManagedObject>>;

    /// Create a new object.
    async fn create(&self, object: ManagedObject) -> Result<()>;

    /// Replace an existing object's content.
    async fn update(&self, object: ManagedObject) -> Result<()>;

    /// Delete an existing object.
    async fn delete(&self, kind: ObjectKind, key: &str) -> Result<()>;
}

/// In-memory object store.
///
/// Refuses hosts whose owning cluster is absent and clusters that still own
/// hosts, so ordering mistakes surface as errors.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<ObjectRef, ManagedObject>>,
}

impl InMemoryObjectStore {
    /// Create a new in-memory object store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new in-memory object store wrapped in an Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Copy of every stored object, ordered by kind then key.
    pub async fn snapshot(&self) -> Vec<ManagedObject> {
        self.objects.read().await.values().cloned().collect()
    }

    /// Total number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, kind: ObjectKind, key: &str) -> Result<Option<ManagedObject>> {
        let objects = self.objects.read().await;
        Ok(objects.get(&ObjectRef::new(kind, key)).cloned())
    }

    async fn list(&self, kind: ObjectKind, scope: &str) -> Result<Vec<ManagedObject>> {
        let objects = self.objects.read().await;
        Ok(objects
            .values()
            .filter(|o| o.kind == kind && o.scope == scope)
            .cloned()
            .collect())
    }

    async fn create(&self, object: ManagedObject) -> Result<()> {
        let mut objects = self.objects.write().await;
        let object_ref = object.object_ref();

        if objects.contains_key(&object_ref) {
            return Err(Error::already_exists(object.kind, object.key));
        }
        if let (ObjectKind::Host, Some(owner)) = (object.kind, &object.owner) {
            if !objects.contains_key(&ObjectRef::new(ObjectKind::Cluster, owner.clone())) {
                return Err(Error::OrphanedHost {
                    key: object.key,
                    owner: owner.clone(),
                });
            }
        }

        objects.insert(object_ref, object);
        Ok(())
    }

    async fn update(&self, object: ManagedObject) -> Result<()> {
        let mut objects = self.objects.write().await;
        match objects.get_mut(&object.object_ref()) {
            Some(existing) => {
                *existing = object;
                Ok(())
            }
            None => Err(Error::not_found(object.kind, object.key)),
        }
    }

    async fn delete(&self, kind: ObjectKind, key: &str) -> Result<()> {
        let mut objects = self.objects.write().await;

        if kind == ObjectKind::Cluster {
            let owned = objects
                .values()
                .filter(|o| o.kind == ObjectKind::Host && o.owner.as_deref() == Some(key))
                .count();
            if owned > 0 {
                return Err(Error::store_failed(
                    "delete",
                    format!("cluster '{key}' still owns {owned} host(s)"),
                ));
            }
        }

        objects
            .remove(&ObjectRef::new(kind, key))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(kind, key))
    }
}

/// A wrapper that adds tracing to an object store.
pub struct TracingObjectStore<S: ObjectStore> {
    inner: S,
}

impl<S: ObjectStore> TracingObjectStore<S> {
    /// Create a new tracing object store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for TracingObjectStore<S> {
    async fn get(&self, kind: ObjectKind, key: &str) -> Result<Option<ManagedObject>> {
        tracing::trace!(%kind, key, "Getting object");
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ObjectKind, scope: &str) -> Result<Vec<ManagedObject>> {
        tracing::debug!(%kind, scope, "Listing objects");
        let result = self.inner.list(kind, scope).await;
        if let Ok(ref objects) = result {
            tracing::trace!(count = objects.len(), "Objects listed");
        }
        result
    }

    async fn create(&self, object: ManagedObject) -> Result<()> {
        tracing::debug!(kind = %object.kind, key = %object.key, "Creating object");
        let result = self.inner.create(object).await;
        if let Err(ref e) = result {
            tracing::debug!(error = %e, "Create failed");
        }
        result
    }

    async fn update(&self, object: ManagedObject) -> Result<()> {
        tracing::debug!(kind = %object.kind, key = %object.key, "Updating object");
        self.inner.update(object).await
    }

    async fn delete(&self, kind: ObjectKind, key: &str) -> Result<()> {
        tracing::debug!(%kind, key, "Deleting object");
        self.inner.delete(kind, key).await
    }
}
