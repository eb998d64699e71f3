//! Migration plan model and admission validation.
//!
//! [`validate`] is a pure gate: it performs no I/O and keeps no state.
//! A rejected plan is corrected and re-submitted by the caller.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, Utc};
//! use vmigrate_plan::{MigrationPlanSpec, VmBatches, validate};
//!
//! let now = Utc::now();
//! let plan = MigrationPlanSpec::new(
//!     now,
//!     now + Duration::hours(2),
//!     VmBatches::new(vec![vec!["web-01".to_string()]]),
//! );
//! assert!(validate(&plan).is_ok());
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod types;
pub mod validator;

pub use types::{AdvancedOptions, MigrationPlanSpec, VmBatches};
pub use validator::{ValidationError, validate};
