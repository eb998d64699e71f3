//! Inventory syncer: mirrors external clusters and hosts into the store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vmigrate_core::{NameDeriver, NamingConfig};

use crate::error::{Error, Result};
use crate::reader::InventoryReader;
use crate::store::ObjectStore;
use crate::types::{
    ActualState, ClusterInfo, DesiredState, ManagedObject, ObjectKind, ReconcileAction,
    SyncReport,
};

/// Configuration for the syncer and its loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Deadline for each inventory read and each store call.
    #[serde(with = "duration_secs", default = "default_operation_timeout")]
    pub operation_timeout: Duration,

    /// Time between passes of the sync loop.
    #[serde(with = "duration_secs", default = "default_interval")]
    pub interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            operation_timeout: default_operation_timeout(),
            interval: default_interval(),
        }
    }
}

impl SyncConfig {
    /// Reject zero durations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if either duration is zero.
    pub fn validate(&self) -> Result<()> {
        if self.operation_timeout.is_zero() {
            return Err(Error::invalid_config("operation_timeout must be positive"));
        }
        if self.interval.is_zero() {
            return Err(Error::invalid_config("interval must be positive"));
        }
        Ok(())
    }
}

const fn default_operation_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_interval() -> Duration {
    Duration::from_secs(60)
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Reconciles inventory snapshots into managed cluster and host objects.
///
/// Passes for one scope are serialized; passes for distinct scopes run
/// independently.
pub struct InventorySyncer {
    reader: Arc<dyn InventoryReader>,
    store: Arc<dyn ObjectStore>,
    deriver: NameDeriver,
    config: SyncConfig,
    scope_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl InventorySyncer {
    /// Create a new syncer.
    pub fn new(
        reader: Arc<dyn InventoryReader>,
        store: Arc<dyn ObjectStore>,
        deriver: NameDeriver,
        config: SyncConfig,
    ) -> Self {
        Self {
            reader,
            store,
            deriver,
            config,
            scope_locks: DashMap::new(),
        }
    }

    /// Read the current inventory for `scope`. Never mutates the store.
    ///
    /// # Errors
    ///
    /// Returns the reader's error, [`Error::Timeout`] past the deadline, or
    /// [`Error::Cancelled`] if `cancel` fires first.
    pub async fn fetch_snapshot(
        &self,
        scope: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ClusterInfo>> {
        let clusters = self
            .guarded(
                "list_clusters_and_hosts",
                scope,
                cancel,
                self.reader.list_clusters_and_hosts(scope),
            )
            .await?;
        debug!(scope, clusters = clusters.len(), "Fetched inventory snapshot");
        Ok(clusters)
    }

    /// Fetch a snapshot and reconcile it.
    ///
    /// The scope lock is held from the read through the last mutation, so an
    /// older snapshot is never applied after a newer one.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_snapshot`] and [`Self::reconcile`]. A failed read
    /// aborts the pass before any mutation.
    pub async fn sync(&self, scope: &str, cancel: &CancellationToken) -> Result<SyncReport> {
        let lock = self.scope_lock(scope);
        let _guard = lock_scope(&lock, scope, cancel).await?;

        let snapshot = self.fetch_snapshot(scope, cancel).await?;
        self.reconcile_locked(scope, &snapshot, cancel).await
    }

    /// Converge the store for `scope` onto `snapshot`.
    ///
    /// Creates run in snapshot order with each cluster before its hosts, then
    /// drifted objects are updated, then stale hosts and finally stale
    /// clusters are deleted. The first failed mutation stops the pass;
    /// already applied mutations stay.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Naming`] before any mutation if a name cannot be
    /// derived, otherwise the first store error, [`Error::Timeout`] or
    /// [`Error::Cancelled`].
    pub async fn reconcile(
        &self,
        scope: &str,
        snapshot: &[ClusterInfo],
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let lock = self.scope_lock(scope);
        let _guard = lock_scope(&lock, scope, cancel).await?;
        self.reconcile_locked(scope, snapshot, cancel).await
    }

    /// Get the naming rules in use.
    pub const fn deriver(&self) -> &NameDeriver {
        &self.deriver
    }

    /// Get the configuration.
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile body; the caller holds the scope lock.
    async fn reconcile_locked(
        &self,
        scope: &str,
        snapshot: &[ClusterInfo],
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let desired = self.desired_state(scope, snapshot)?;
        let actual = self.actual_state(scope, cancel).await?;

        info!(
            scope,
            desired = desired.len(),
            actual = actual.len(),
            "Starting reconciliation"
        );

        let actions = diff(&desired, &actual);
        debug!(scope, actions = actions.len(), "Generated actions");

        let mut applied = Vec::with_capacity(actions.len());
        for action in actions {
            if cancel.is_cancelled() {
                warn!(scope, applied = applied.len(), "Reconciliation cancelled");
                return Err(Error::cancelled(scope));
            }

            debug!(scope, action = %action.description(), "Applying action");
            if let Err(e) = self.apply(scope, &action, cancel).await {
                warn!(
                    scope,
                    action = %action.description(),
                    applied = applied.len(),
                    error = %e,
                    "Action failed, stopping pass"
                );
                return Err(e);
            }
            applied.push(action);
        }

        let report = SyncReport::new(scope, applied, desired.len(), actual.len());
        if report.converged {
            info!(scope, "Scope converged");
        } else {
            info!(
                scope,
                actions_taken = report.actions.len(),
                "Reconciliation complete"
            );
        }
        Ok(report)
    }

    fn scope_lock(&self, scope: &str) -> Arc<Mutex<()>> {
        self.scope_locks
            .entry(scope.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn desired_state(&self, scope: &str, snapshot: &[ClusterInfo]) -> Result<DesiredState> {
        let mut desired = DesiredState::new();

        for cluster in snapshot {
            let cluster_key = self.deriver.cluster_key(scope, &cluster.name)?;
            if !desired.add(ManagedObject::cluster(&cluster_key, scope, &cluster.name)) {
                warn!(scope, cluster = %cluster.name, key = %cluster_key, "Duplicate cluster key, ignoring");
                continue;
            }

            for host in &cluster.hosts {
                let host_key = self.deriver.host_key(scope, &cluster.name, &host.name)?;
                if !desired.add(ManagedObject::host(&host_key, scope, &cluster_key, host)) {
                    warn!(scope, host = %host.name, key = %host_key, "Duplicate host key, ignoring");
                }
            }
        }

        Ok(desired)
    }

    async fn actual_state(&self, scope: &str, cancel: &CancellationToken) -> Result<ActualState> {
        let clusters = self
            .guarded("list", scope, cancel, self.store.list(ObjectKind::Cluster, scope))
            .await?;
        let hosts = self
            .guarded("list", scope, cancel, self.store.list(ObjectKind::Host, scope))
            .await?;
        Ok(clusters.into_iter().chain(hosts).collect())
    }

    async fn apply(
        &self,
        scope: &str,
        action: &ReconcileAction,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match action {
            ReconcileAction::Create { object } => {
                self.guarded("create", scope, cancel, self.store.create(object.clone()))
                    .await
            }
            ReconcileAction::Update { object } => {
                self.guarded("update", scope, cancel, self.store.update(object.clone()))
                    .await
            }
            ReconcileAction::Delete { object_ref } => {
                self.guarded(
                    "delete",
                    scope,
                    cancel,
                    self.store.delete(object_ref.kind, &object_ref.key),
                )
                .await
            }
        }
    }

    /// Run a collaborator call under the configured deadline and `cancel`.
    async fn guarded<T, F>(
        &self,
        operation: &str,
        scope: &str,
        cancel: &CancellationToken,
        call: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let after = self.config.operation_timeout;
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::cancelled(scope)),
            outcome = tokio::time::timeout(after, call) => match outcome {
                Ok(result) => result,
                Err(_) => Err(Error::timeout(operation, after)),
            },
        }
    }
}

/// Wait for the scope lock unless `cancel` fires first.
async fn lock_scope<'a>(
    lock: &'a Mutex<()>,
    scope: &str,
    cancel: &CancellationToken,
) -> Result<MutexGuard<'a, ()>> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled(scope)),
        guard = lock.lock() => Ok(guard),
    }
}

/// Compute the ordered mutations that turn `actual` into `desired`.
///
/// Objects present and unchanged in both produce nothing.
pub fn diff(desired: &DesiredState, actual: &ActualState) -> Vec<ReconcileAction> {
    let mut creates = Vec::new();
    let mut updates = Vec::new();

    // 1. Create missing objects, update drifted ones
    for object in desired.iter() {
        match actual.get(&object.object_ref()) {
            None => creates.push(ReconcileAction::Create {
                object: object.clone(),
            }),
            Some(existing) if existing.drifted_from(object) => {
                updates.push(ReconcileAction::Update {
                    object: object.clone(),
                });
            }
            Some(_) => {}
        }
    }

    // 2. Delete stale hosts, then stale clusters
    let deletes = actual
        .stale(desired, ObjectKind::Host)
        .into_iter()
        .chain(actual.stale(desired, ObjectKind::Cluster))
        .map(|o| ReconcileAction::Delete {
            object_ref: o.object_ref(),
        });

    creates.into_iter().chain(updates).chain(deletes).collect()
}

/// Builder for [`InventorySyncer`].
#[derive(Default)]
pub struct InventorySyncerBuilder {
    reader: Option<Arc<dyn InventoryReader>>,
    store: Option<Arc<dyn ObjectStore>>,
    naming: NamingConfig,
    config: SyncConfig,
}

impl InventorySyncerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inventory reader.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn InventoryReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Set the object store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the naming rules.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    /// Set the sync configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the syncer, validating naming and sync configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the reader or store is missing or
    /// the sync config is invalid, and [`Error::Naming`] for bad naming rules.
    pub fn build(self) -> Result<InventorySyncer> {
        let reader = self
            .reader
            .ok_or_else(|| Error::invalid_config("inventory reader is required"))?;
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("object store is required"))?;
        self.config.validate()?;
        let deriver = NameDeriver::new(self.naming)?;

        Ok(InventorySyncer::new(reader, store, deriver, self.config))
    }
}
