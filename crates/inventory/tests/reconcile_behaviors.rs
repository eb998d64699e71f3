//! Behavior tests for inventory reconciliation.
//!
//! Every pass runs against a recording store so the exact order of
//! mutations can be asserted:
//! - clusters are created before their hosts
//! - hosts are deleted before their cluster
//! - an unchanged snapshot produces no mutations
//! - a failed read or a failed mutation stops the pass
//! - names that only differ in separator placement never share a key
//!
//! # Quality Standards
//! - Zero unwraps in tests
//! - Stand-in collaborators only, no external services

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use vmigrate_inventory::{
    ClusterInfo, Error, HostInfo, InMemoryObjectStore, InventoryReader, InventorySyncer,
    InventorySyncerBuilder, ManagedObject, ObjectKind, ObjectStore, Result, StaticInventoryReader,
    SyncConfig,
};

/// One mutation observed by the recording store.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Create(ObjectKind, String),
    Update(ObjectKind, String),
    Delete(ObjectKind, String),
}

impl Op {
    fn kind(&self) -> ObjectKind {
        match self {
            Self::Create(kind, _) | Self::Update(kind, _) | Self::Delete(kind, _) => *kind,
        }
    }

    fn is_create(&self) -> bool {
        matches!(self, Self::Create(..))
    }

    fn is_delete(&self) -> bool {
        matches!(self, Self::Delete(..))
    }
}

/// Store that records mutations and can fail the nth one.
struct RecordingStore {
    inner: InMemoryObjectStore,
    ops: Mutex<Vec<Op>>,
    mutations: AtomicUsize,
    fail_at: Option<usize>,
    cancel_at: Option<(usize, CancellationToken)>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryObjectStore::new(),
            ops: Mutex::new(Vec::new()),
            mutations: AtomicUsize::new(0),
            fail_at: None,
            cancel_at: None,
        }
    }

    fn failing_at(n: usize) -> Self {
        Self {
            fail_at: Some(n),
            ..Self::new()
        }
    }

    fn cancelling_at(n: usize, token: CancellationToken) -> Self {
        Self {
            cancel_at: Some((n, token)),
            ..Self::new()
        }
    }

    async fn ops(&self) -> Vec<Op> {
        self.ops.lock().await.clone()
    }

    async fn clear(&self) {
        self.ops.lock().await.clear();
    }

    /// Count the mutation; fail it if it is the configured one.
    fn admit(&self, op: &str) -> Result<()> {
        let n = self.mutations.fetch_add(1, Ordering::SeqCst);
        if let Some((at, token)) = &self.cancel_at {
            if n == *at {
                token.cancel();
            }
        }
        if self.fail_at == Some(n) {
            return Err(Error::store_failed(op, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn get(&self, kind: ObjectKind, key: &str) -> Result<Option<ManagedObject>> {
        self.inner.get(kind, key).await
    }

    async fn list(&self, kind: ObjectKind, scope: &str) -> Result<Vec<ManagedObject>> {
        self.inner.list(kind, scope).await
    }

    async fn create(&self, object: ManagedObject) -> Result<()> {
        self.admit("create")?;
        let op = Op::Create(object.kind, object.key.clone());
        self.inner.create(object).await?;
        self.ops.lock().await.push(op);
        Ok(())
    }

    async fn update(&self, object: ManagedObject) -> Result<()> {
        self.admit("update")?;
        let op = Op::Update(object.kind, object.key.clone());
        self.inner.update(object).await?;
        self.ops.lock().await.push(op);
        Ok(())
    }

    async fn delete(&self, kind: ObjectKind, key: &str) -> Result<()> {
        self.admit("delete")?;
        self.inner.delete(kind, key).await?;
        self.ops.lock().await.push(Op::Delete(kind, key.to_string()));
        Ok(())
    }
}

/// Reader that always fails.
struct UnreachableReader;

#[async_trait]
impl InventoryReader for UnreachableReader {
    async fn list_clusters_and_hosts(&self, scope: &str) -> Result<Vec<ClusterInfo>> {
        Err(Error::inventory_read(scope, "connection refused"))
    }
}

/// Reader that never answers.
struct HangingReader;

#[async_trait]
impl InventoryReader for HangingReader {
    async fn list_clusters_and_hosts(&self, _scope: &str) -> Result<Vec<ClusterInfo>> {
        std::future::pending().await
    }
}

/// Reader that parks inside the read until released.
struct GatedReader {
    snapshot: Vec<ClusterInfo>,
    entered: Notify,
    release: Notify,
}

impl GatedReader {
    fn new(snapshot: Vec<ClusterInfo>) -> Self {
        Self {
            snapshot,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl InventoryReader for GatedReader {
    async fn list_clusters_and_hosts(&self, _scope: &str) -> Result<Vec<ClusterInfo>> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.snapshot.clone())
    }
}

fn build(reader: Arc<dyn InventoryReader>, store: Arc<dyn ObjectStore>) -> Result<InventorySyncer> {
    InventorySyncerBuilder::new()
        .with_reader(reader)
        .with_store(store)
        .build()
}

fn two_clusters() -> Vec<ClusterInfo> {
    vec![
        ClusterInfo::new(
            "Cluster-A",
            vec![
                HostInfo::new("esx-a1.example.com", "uuid-a1"),
                HostInfo::new("esx-a2.example.com", "uuid-a2"),
            ],
        ),
        ClusterInfo::new(
            "Cluster-B",
            vec![HostInfo::new("esx-b1.example.com", "uuid-b1")],
        ),
    ]
}

/// Index of the first op matching `pred`.
fn position(ops: &[Op], pred: impl Fn(&Op) -> bool) -> Result<usize> {
    ops.iter()
        .position(pred)
        .ok_or_else(|| Error::store_failed("assert", format!("no matching op in {ops:?}")))
}

#[tokio::test]
async fn second_pass_over_same_snapshot_makes_no_mutations() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let cancel = CancellationToken::new();

    let first = syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;
    assert_eq!(first.actions.len(), 5);
    assert!(!first.converged);

    store.clear().await;
    let second = syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;
    assert!(second.converged);
    assert!(store.ops().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn new_cluster_is_created_before_its_host() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let cancel = CancellationToken::new();

    syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;
    store.clear().await;

    let mut grown = two_clusters();
    grown.push(ClusterInfo::new(
        "Cluster-C",
        vec![HostInfo::new("esx-c1.example.com", "uuid-c1")],
    ));
    syncer.reconcile("vc-a", &grown, &cancel).await?;

    let ops = store.ops().await;
    assert_eq!(ops.len(), 2);
    let cluster_at = position(&ops, |op| op.is_create() && op.kind() == ObjectKind::Cluster)?;
    let host_at = position(&ops, |op| op.is_create() && op.kind() == ObjectKind::Host)?;
    assert!(cluster_at < host_at);
    Ok(())
}

#[tokio::test]
async fn dropped_cluster_deletes_hosts_first() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let cancel = CancellationToken::new();

    syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;
    store.clear().await;

    let shrunk: Vec<ClusterInfo> = two_clusters().into_iter().skip(1).collect();
    syncer.reconcile("vc-a", &shrunk, &cancel).await?;

    let ops = store.ops().await;
    assert_eq!(ops.len(), 3);
    assert!(ops.iter().all(Op::is_delete));
    let last_host = ops
        .iter()
        .rposition(|op| op.kind() == ObjectKind::Host)
        .unwrap_or(usize::MAX);
    let cluster_at = position(&ops, |op| op.kind() == ObjectKind::Cluster)?;
    assert!(last_host < cluster_at);
    assert_eq!(store.list(ObjectKind::Cluster, "vc-a").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_mutation_stops_the_pass() -> Result<()> {
    // Third mutation is the second host of Cluster-A
    let store = Arc::new(RecordingStore::failing_at(2));
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;

    let outcome = syncer
        .reconcile("vc-a", &two_clusters(), &CancellationToken::new())
        .await;
    assert!(matches!(outcome, Err(Error::StoreFailed { .. })));

    let ops = store.ops().await;
    assert_eq!(ops.len(), 2);
    assert!(!ops.iter().any(|op| matches!(op, Op::Create(_, key) if key.contains("cluster-b"))));
    Ok(())
}

#[tokio::test]
async fn failed_pass_is_completed_by_the_next_one() -> Result<()> {
    let store = Arc::new(RecordingStore::failing_at(1));
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let cancel = CancellationToken::new();

    assert!(syncer.reconcile("vc-a", &two_clusters(), &cancel).await.is_err());
    let report = syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;

    assert_eq!(report.actions.len(), 4);
    assert_eq!(store.list(ObjectKind::Host, "vc-a").await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn read_failure_leaves_store_untouched() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let seed = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    seed.reconcile("vc-a", &two_clusters(), &CancellationToken::new())
        .await?;
    store.clear().await;

    let syncer = build(Arc::new(UnreachableReader), store.clone())?;
    let outcome = syncer.sync("vc-a", &CancellationToken::new()).await;

    assert!(matches!(outcome, Err(Error::InventoryRead { .. })));
    assert!(store.ops().await.is_empty());
    assert_eq!(store.list(ObjectKind::Host, "vc-a").await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn cancellation_mid_pass_stops_further_mutations() -> Result<()> {
    let cancel = CancellationToken::new();
    let store = Arc::new(RecordingStore::cancelling_at(0, cancel.clone()));
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;

    let outcome = syncer.reconcile("vc-a", &two_clusters(), &cancel).await;

    assert!(matches!(outcome, Err(Error::Cancelled { .. })));
    assert!(store.ops().await.len() <= 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn hanging_reader_times_out() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = InventorySyncerBuilder::new()
        .with_reader(Arc::new(HangingReader))
        .with_store(store.clone())
        .with_config(SyncConfig {
            operation_timeout: Duration::from_secs(2),
            ..SyncConfig::default()
        })
        .build()?;

    let outcome = syncer.sync("vc-a", &CancellationToken::new()).await;

    assert!(matches!(outcome, Err(Error::Timeout { ref operation, .. }) if operation == "list_clusters_and_hosts"));
    assert!(store.ops().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn drifted_host_is_updated_in_place() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let cancel = CancellationToken::new();

    syncer.reconcile("vc-a", &two_clusters(), &cancel).await?;
    store.clear().await;

    let mut replaced = two_clusters();
    if let Some(host) = replaced.get_mut(1).and_then(|c| c.hosts.get_mut(0)) {
        host.hardware_uuid = "uuid-b1-replaced".to_string();
    }
    syncer.reconcile("vc-a", &replaced, &cancel).await?;

    let ops = store.ops().await;
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops.first(), Some(Op::Update(ObjectKind::Host, _))));
    Ok(())
}

#[tokio::test]
async fn scopes_do_not_touch_each_other() -> Result<()> {
    let reader = Arc::new(StaticInventoryReader::new());
    reader.set("vc-a", two_clusters()).await;
    reader
        .set(
            "vc-b",
            vec![ClusterInfo::new("Cluster-A", vec![HostInfo::new("esx-x", "uuid-x")])],
        )
        .await;
    let store = Arc::new(InMemoryObjectStore::new());
    let syncer = Arc::new(build(reader.clone(), store.clone())?);

    let cancel = CancellationToken::new();
    let (a, b) = tokio::join!(syncer.sync("vc-a", &cancel), syncer.sync("vc-b", &cancel));
    a?;
    b?;
    assert_eq!(store.len().await, 7);

    // Emptying one scope must not delete the other's objects
    reader.set("vc-b", Vec::new()).await;
    syncer.sync("vc-b", &cancel).await?;
    assert_eq!(store.list(ObjectKind::Cluster, "vc-a").await?.len(), 2);
    assert!(store.list(ObjectKind::Cluster, "vc-b").await?.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_passes_on_one_scope_serialize() -> Result<()> {
    let reader = Arc::new(StaticInventoryReader::new());
    reader.set("vc-a", two_clusters()).await;
    let store = Arc::new(RecordingStore::new());
    let syncer = Arc::new(build(reader, store.clone())?);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let syncer = Arc::clone(&syncer);
            tokio::spawn(async move { syncer.sync("vc-a", &CancellationToken::new()).await })
        })
        .collect();

    for handle in handles {
        handle
            .await
            .map_err(|e| Error::store_failed("join", e.to_string()))??;
    }

    // Without serialization, racing passes would collide on create
    assert_eq!(store.ops().await.len(), 5);
    Ok(())
}

#[tokio::test]
async fn hosts_split_differently_across_clusters_are_all_created() -> Result<()> {
    let store = Arc::new(RecordingStore::new());
    let syncer = build(Arc::new(StaticInventoryReader::new()), store.clone())?;
    let snapshot = vec![
        ClusterInfo::new("prod", vec![HostInfo::new("east-esx01", "uuid-1")]),
        ClusterInfo::new("prod-east", vec![HostInfo::new("esx01", "uuid-2")]),
    ];

    let report = syncer
        .reconcile("vc", &snapshot, &CancellationToken::new())
        .await?;

    assert_eq!(report.actions.len(), 4);
    let hosts = store.list(ObjectKind::Host, "vc").await?;
    assert_eq!(hosts.len(), 2);
    assert!(hosts.iter().any(|h| h.hardware_uuid.as_deref() == Some("uuid-1")));
    assert!(hosts.iter().any(|h| h.hardware_uuid.as_deref() == Some("uuid-2")));
    Ok(())
}

#[tokio::test]
async fn overlapping_scope_names_converge_independently() -> Result<()> {
    let reader = Arc::new(StaticInventoryReader::new());
    reader
        .set(
            "vcenter",
            vec![ClusterInfo::new("prod-c1", vec![HostInfo::new("esx01", "uuid-a")])],
        )
        .await;
    reader
        .set(
            "vcenter-prod",
            vec![ClusterInfo::new("c1", vec![HostInfo::new("esx01", "uuid-b")])],
        )
        .await;
    let store = Arc::new(InMemoryObjectStore::new());
    let syncer = build(reader, store.clone())?;
    let cancel = CancellationToken::new();

    syncer.sync("vcenter", &cancel).await?;
    let first = syncer.sync("vcenter-prod", &cancel).await?;
    assert_eq!(first.actions.len(), 2);

    // Both scopes are settled; further passes change nothing
    assert!(syncer.sync("vcenter-prod", &cancel).await?.converged);
    assert!(syncer.sync("vcenter", &cancel).await?.converged);
    assert_eq!(store.list(ObjectKind::Cluster, "vcenter").await?.len(), 1);
    assert_eq!(store.list(ObjectKind::Cluster, "vcenter-prod").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn reconcile_waits_for_in_flight_sync_read() -> Result<()> {
    let stale = vec![ClusterInfo::new("c1", vec![HostInfo::new("esx-old", "uuid-old")])];
    let fresh = vec![ClusterInfo::new("c1", vec![HostInfo::new("esx-new", "uuid-new")])];

    let reader = Arc::new(GatedReader::new(stale));
    let store = Arc::new(InMemoryObjectStore::new());
    let syncer = Arc::new(build(reader.clone(), store.clone())?);

    // Pass one parks inside its read while holding the scope
    let slow = tokio::spawn({
        let syncer = Arc::clone(&syncer);
        async move { syncer.sync("vc", &CancellationToken::new()).await }
    });
    reader.entered.notified().await;

    // Pass two carries newer data and must queue behind pass one
    let fast = tokio::spawn({
        let syncer = Arc::clone(&syncer);
        async move {
            syncer
                .reconcile("vc", &fresh, &CancellationToken::new())
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_empty().await);

    reader.release.notify_one();
    let join = |e: tokio::task::JoinError| Error::store_failed("join", e.to_string());
    slow.await.map_err(join)??;
    fast.await.map_err(join)??;

    let hosts = store.list(ObjectKind::Host, "vc").await?;
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts.first().map(|h| h.display_name.as_str()), Some("esx-new"));
    Ok(())
}
