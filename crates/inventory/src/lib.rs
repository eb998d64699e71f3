//! Reconciliation of external cluster/host inventory into managed objects.
//!
//! Each pass for a credential scope:
//! 1. Reads the inventory snapshot ([`InventoryReader`])
//! 2. Derives a stable key per cluster and host
//! 3. Diffs against the objects in the [`ObjectStore`]
//! 4. Applies creates (cluster before its hosts), updates, then deletes
//!    (hosts before their cluster), stopping at the first failure
//!
//! Passes are idempotent: an unchanged snapshot produces no mutations.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vmigrate_inventory::{
//!     ClusterInfo, HostInfo, InMemoryObjectStore, InventorySyncerBuilder,
//!     StaticInventoryReader,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vmigrate_inventory::Result<()> {
//! let reader = Arc::new(StaticInventoryReader::new());
//! reader
//!     .set("vc-a", vec![ClusterInfo::new("Cluster01", vec![HostInfo::new("esx01", "uuid-1")])])
//!     .await;
//!
//! let syncer = InventorySyncerBuilder::new()
//!     .with_reader(reader)
//!     .with_store(InMemoryObjectStore::new_arc())
//!     .build()?;
//!
//! let report = syncer.sync("vc-a", &CancellationToken::new()).await?;
//! assert_eq!(report.actions.len(), 2);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod reader;
pub mod store;
pub mod sync_loop;
pub mod syncer;
pub mod types;

pub use error::{Error, Result, StoreConflict};
pub use reader::{FileInventoryReader, InventoryReader, StaticInventoryReader};
pub use store::{InMemoryObjectStore, ObjectStore, TracingObjectStore};
pub use sync_loop::{LoopStats, SyncLoop};
pub use syncer::{InventorySyncer, InventorySyncerBuilder, SyncConfig, diff};
pub use types::{
    ActualState, ClusterInfo, DesiredState, HostInfo, ManagedObject, ObjectKind, ObjectRef,
    ReconcileAction, SyncReport,
};
