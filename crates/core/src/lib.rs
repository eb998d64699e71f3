//! Core types shared by the vmigrate crates.
//!
//! - [`naming`]: deterministic, DNS-label-safe identifier derivation
//! - [`config`]: naming budgets and document loading
//! - [`error`]: the core error taxonomy

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod naming;

pub use config::{NamingConfig, load_document};
pub use error::{Error, Result};
pub use naming::{
    MAX_IDENTIFIER_LEN, NameDeriver, derive_unique_name, hash, is_identifier, normalize,
};
