//! Binary configuration: file plus environment overrides.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vmigrate_core::{NameDeriver, NamingConfig};
use vmigrate_inventory::SyncConfig;

/// Top-level configuration for the `vmigrate` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Naming budgets and prefixes.
    #[serde(default)]
    pub naming: NamingConfig,

    /// Syncer deadlines and loop period.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Credential scopes synced when none are given on the command line.
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Config {
    /// Load configuration from a file (TOML, or JSON/YAML by extension).
    pub fn from_file(path: &Path) -> Result<Self> {
        vmigrate_core::load_document(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Load from `path` if given, else defaults, then apply env overrides
    /// and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `VMIGRATE_SCOPE` and `VMIGRATE_SYNC_INTERVAL_SECS` from `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if let Some(scopes) = lookup("VMIGRATE_SCOPE") {
            self.scopes = scopes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(secs) = lookup("VMIGRATE_SYNC_INTERVAL_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("VMIGRATE_SYNC_INTERVAL_SECS is not a number: {secs}"))?;
            self.sync.interval = Duration::from_secs(secs);
        }

        Ok(self)
    }

    /// Validate naming and sync settings.
    pub fn validate(&self) -> Result<()> {
        self.naming
            .validate()
            .context("Invalid [naming] configuration")?;
        self.sync.validate().context("Invalid [sync] configuration")?;
        Ok(())
    }

    /// Build the name deriver for these settings.
    pub fn deriver(&self) -> Result<NameDeriver> {
        NameDeriver::new(self.naming.clone()).context("Invalid [naming] configuration")
    }
}
