//! # vmigrate
//!
//! Core of a VM-migration control plane: deterministic object naming,
//! migration plan admission and inventory reconciliation.
//!
//! This library re-exports the workspace crates and hosts the CLI plumbing
//! used by the `vmigrate` binary.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub use vmigrate_core;
pub use vmigrate_inventory;
pub use vmigrate_plan;

pub mod cli;
pub mod commands;
pub mod config;
