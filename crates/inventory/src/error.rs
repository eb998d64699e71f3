//! Error types for the inventory crate.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Conflicting store writes. Kept apart so callers can treat them as
/// already-converged instead of as transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreConflict {
    #[error("{kind} '{key}' already exists")]
    AlreadyExists { kind: String, key: String },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },
}

/// Inventory error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Reading the external inventory failed. No mutations were attempted.
    #[error("failed to read inventory for scope '{scope}': {reason}")]
    InventoryRead { scope: String, reason: String },

    /// Create on an existing key, or update/delete on a missing one.
    #[error("store conflict: {0}")]
    StoreConflict(#[from] StoreConflict),

    /// Any other store failure.
    #[error("store operation '{operation}' failed: {reason}")]
    StoreFailed { operation: String, reason: String },

    /// A host was written without its owning cluster.
    #[error("host '{key}' references missing cluster '{owner}'")]
    OrphanedHost { key: String, owner: String },

    /// Key derivation failed.
    #[error(transparent)]
    Naming(#[from] vmigrate_core::Error),

    /// The pass was cancelled before it finished.
    #[error("reconciliation of scope '{scope}' cancelled")]
    Cancelled { scope: String },

    /// A collaborator call exceeded its deadline.
    #[error("'{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an inventory read error.
    pub fn inventory_read(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InventoryRead {
            scope: scope.into(),
            reason: reason.into(),
        }
    }

    /// Create a store failed error.
    pub fn store_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StoreFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an already-exists conflict.
    pub fn already_exists(kind: impl ToString, key: impl Into<String>) -> Self {
        Self::StoreConflict(StoreConflict::AlreadyExists {
            kind: kind.to_string(),
            key: key.into(),
        })
    }

    /// Create a not-found conflict.
    pub fn not_found(kind: impl ToString, key: impl Into<String>) -> Self {
        Self::StoreConflict(StoreConflict::NotFound {
            kind: kind.to_string(),
            key: key.into(),
        })
    }

    /// Create a cancelled error.
    pub fn cancelled(scope: impl Into<String>) -> Self {
        Self::Cancelled {
            scope: scope.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether this is a create/update/delete conflict.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::StoreConflict(_))
    }
}
