//! Naming constraints and document loading.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::naming::{self, MAX_IDENTIFIER_LEN};

/// Length budgets and prefixes used when deriving object names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Upper bound for any derived name.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Number of hex digest characters appended to unique names.
    #[serde(default = "default_hash_suffix_len")]
    pub hash_suffix_len: usize,

    /// How much of a VM name survives in its shadow object name.
    #[serde(default = "default_vm_name_max_len")]
    pub vm_name_max_len: usize,

    /// Prefix of conversion job names.
    #[serde(default = "default_job_prefix")]
    pub job_prefix: String,

    /// Length of the hash-suffixed token each scope or cluster contributes
    /// to inventory keys.
    #[serde(default = "default_key_segment_len")]
    pub key_segment_len: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_name_len: default_max_name_len(),
            hash_suffix_len: default_hash_suffix_len(),
            vm_name_max_len: default_vm_name_max_len(),
            job_prefix: default_job_prefix(),
            key_segment_len: default_key_segment_len(),
        }
    }
}

impl NamingConfig {
    /// Total length budget of a VM shadow name: base, `-`, hash suffix.
    pub const fn vm_shadow_budget(&self) -> usize {
        self.vm_name_max_len
            .saturating_add(1)
            .saturating_add(self.hash_suffix_len)
    }

    /// Check every budget this config implies.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstraint`] on the first malformed budget.
    pub fn validate(&self) -> Result<()> {
        if self.max_name_len > MAX_IDENTIFIER_LEN {
            return Err(Error::invalid_constraint(format!(
                "max_name_len {} exceeds {MAX_IDENTIFIER_LEN}",
                self.max_name_len
            )));
        }
        if self.vm_name_max_len == 0 {
            return Err(Error::invalid_constraint("vm_name_max_len must be positive"));
        }
        if self.vm_shadow_budget() > self.max_name_len {
            return Err(Error::invalid_constraint(format!(
                "vm shadow names need {} characters but max_name_len is {}",
                self.vm_shadow_budget(),
                self.max_name_len
            )));
        }
        if naming::normalize(&self.job_prefix).is_err() {
            return Err(Error::invalid_constraint(format!(
                "job prefix '{}' has no identifier characters",
                self.job_prefix
            )));
        }
        naming::check_budget(self.max_name_len, self.hash_suffix_len)?;
        naming::check_budget(self.vm_shadow_budget(), self.hash_suffix_len)?;
        naming::check_budget(self.key_segment_len, self.hash_suffix_len)?;

        // Host keys carry two segment tokens ahead of the host name.
        let host_prefix_len = self.key_segment_len.saturating_add(1).saturating_mul(2);
        if host_prefix_len.saturating_add(self.hash_suffix_len).saturating_add(1) >= self.max_name_len
        {
            return Err(Error::invalid_constraint(format!(
                "key_segment_len {} leaves no room for host names within {} characters",
                self.key_segment_len, self.max_name_len
            )));
        }
        Ok(())
    }
}

const fn default_max_name_len() -> usize {
    MAX_IDENTIFIER_LEN
}

const fn default_hash_suffix_len() -> usize {
    5
}

const fn default_vm_name_max_len() -> usize {
    55
}

fn default_job_prefix() -> String {
    "v2v-helper-".to_string()
}

const fn default_key_segment_len() -> usize {
    16
}

/// Load a document from disk, picking the format from the file extension.
///
/// `.json` is parsed as JSON, `.yaml`/`.yml` as YAML, anything else as TOML.
///
/// # Errors
///
/// Returns [`Error::FileReadFailed`] if the file cannot be read and
/// [`Error::ParseFailed`] if its content does not match `T`.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::file_read_failed(path, e.to_string()))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    tracing::debug!(path = %path.display(), format = ?extension, "Loading document");

    match extension.as_deref() {
        Some("json") => {
            serde_json::from_str(&content).map_err(|e| Error::parse_failed(path, e.to_string()))
        }
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&content).map_err(|e| Error::parse_failed(path, e.to_string()))
        }
        _ => toml::from_str(&content).map_err(|e| Error::parse_failed(path, e.to_string())),
    }
}
