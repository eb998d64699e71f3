//! Deterministic identifier derivation.
//!
//! Every name produced here is a DNS label: lowercase ASCII alphanumerics and
//! `-`, at most 63 characters, starting and ending with an alphanumeric.
//!
//! # Character policy
//!
//! Input is lowercased with ASCII rules only. Any character outside
//! `[a-z0-9]` after lowercasing, including every non-ASCII character, acts as
//! a separator: a run of separators becomes a single `-`. Input made only of
//! separators fails with [`Error::EmptyName`].
//!
//! # Unique names
//!
//! [`derive_unique_name`] appends a SHA-256 suffix computed over the full
//! normalized text *before* truncation:
//!
//! ```text
//! base   = normalize(prefix + raw)
//! digest = sha256_hex(base)
//! name   = base[..max_total_len - hash_len - 1] + "-" + digest[..hash_len]
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use sha2::{Digest, Sha256};

use crate::config::NamingConfig;
use crate::error::{Error, Result};

/// Longest identifier the control plane accepts.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Length of a full hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

const MIGRATION_PREFIX: &str = "migration-";
const MIGRATION_CONFIG_PREFIX: &str = "migration-config-";

/// Normalize arbitrary text into an identifier.
///
/// # Errors
///
/// Returns [`Error::EmptyName`] if no alphanumeric character remains.
pub fn normalize(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len().min(MAX_IDENTIFIER_LEN));
    let mut pending_separator = false;

    for c in raw.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c);
        } else {
            pending_separator = true;
        }
        if out.len() >= MAX_IDENTIFIER_LEN {
            break;
        }
    }

    // Output is pure ASCII, so byte truncation is char-safe.
    out.truncate(MAX_IDENTIFIER_LEN);
    let trimmed_len = out.trim_end_matches('-').len();
    out.truncate(trimmed_len);

    if out.is_empty() {
        return Err(Error::empty_name(raw));
    }
    Ok(out)
}

/// Lowercase hex SHA-256 of the exact bytes of `text`.
pub fn hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Derive a length-bounded, hash-suffixed identifier.
///
/// # Errors
///
/// Returns [`Error::InvalidConstraint`] when the length budget cannot hold a
/// non-empty base plus `-` plus the suffix, and [`Error::EmptyName`] when
/// `prefix + raw` normalizes to nothing.
pub fn derive_unique_name(
    raw: &str,
    prefix: &str,
    max_total_len: usize,
    hash_len: usize,
) -> Result<String> {
    check_budget(max_total_len, hash_len)?;

    let base = normalize(&format!("{prefix}{raw}"))?;
    let digest = hash(&base);

    let base_budget = max_total_len - hash_len - 1;
    let truncated: String = base.chars().take(base_budget).collect();
    let suffix: String = digest.chars().take(hash_len).collect();

    Ok(format!("{truncated}-{suffix}"))
}

/// Validate a `(max_total_len, hash_len)` pair.
///
/// # Errors
///
/// Returns [`Error::InvalidConstraint`] describing the first violated bound.
pub fn check_budget(max_total_len: usize, hash_len: usize) -> Result<()> {
    if hash_len == 0 || hash_len > DIGEST_HEX_LEN {
        return Err(Error::invalid_constraint(format!(
            "hash length {hash_len} must be between 1 and {DIGEST_HEX_LEN}"
        )));
    }
    if max_total_len > MAX_IDENTIFIER_LEN {
        return Err(Error::invalid_constraint(format!(
            "total length {max_total_len} exceeds identifier limit {MAX_IDENTIFIER_LEN}"
        )));
    }
    if hash_len + 1 >= max_total_len {
        return Err(Error::invalid_constraint(format!(
            "total length {max_total_len} leaves no room for a base name with a {hash_len}-char hash suffix"
        )));
    }
    Ok(())
}

/// Check whether `s` already satisfies the identifier grammar.
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    let alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= MAX_IDENTIFIER_LEN
                && alnum(first)
                && alnum(last)
                && bytes.iter().all(|b| alnum(b) || *b == b'-')
        }
        _ => false,
    }
}

/// Name of the migration object for a VM. Plain prefixing, no normalization.
pub fn migration_name(vm_name: &str) -> String {
    format!("{MIGRATION_PREFIX}{vm_name}")
}

/// Name of the per-VM migration config map. Plain prefixing, no normalization.
pub fn migration_config_map_name(vm_name: &str) -> String {
    format!("{MIGRATION_CONFIG_PREFIX}{vm_name}")
}

/// Name derivation bound to a validated [`NamingConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameDeriver {
    config: NamingConfig,
}

impl NameDeriver {
    /// Create a deriver, validating the configuration once.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConstraint`] if the config is malformed.
    pub fn new(config: NamingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this deriver was built with.
    pub const fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Name of the shadow object mirroring a VM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyName`] if `vm_name` normalizes to nothing.
    pub fn vm_shadow_name(&self, vm_name: &str) -> Result<String> {
        derive_unique_name(
            vm_name,
            "",
            self.config.vm_shadow_budget(),
            self.config.hash_suffix_len,
        )
    }

    /// Name of the conversion job for a VM.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyName`] if `vm_name` normalizes to nothing.
    pub fn job_name(&self, vm_name: &str) -> Result<String> {
        ensure_nonempty(vm_name)?;
        derive_unique_name(
            vm_name,
            &self.config.job_prefix,
            self.config.max_name_len,
            self.config.hash_suffix_len,
        )
    }

    /// Store key of a cluster within a credential scope.
    ///
    /// The scope enters the key as a hash-suffixed token, so scopes and
    /// clusters that only differ in where a `-` falls still get distinct keys.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyName`] if `scope` or `cluster` normalizes to
    /// nothing.
    pub fn cluster_key(&self, scope: &str, cluster: &str) -> Result<String> {
        ensure_nonempty(cluster)?;
        let scope_token = self.segment_token(scope)?;
        derive_unique_name(
            cluster,
            &format!("{scope_token}-"),
            self.config.max_name_len,
            self.config.hash_suffix_len,
        )
    }

    /// Store key of a host, scoped to its cluster and credential scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyName`] if `scope`, `cluster` or `host`
    /// normalizes to nothing.
    pub fn host_key(&self, scope: &str, cluster: &str, host: &str) -> Result<String> {
        ensure_nonempty(host)?;
        let scope_token = self.segment_token(scope)?;
        let cluster_token = self.segment_token(cluster)?;
        derive_unique_name(
            host,
            &format!("{scope_token}-{cluster_token}-"),
            self.config.max_name_len,
            self.config.hash_suffix_len,
        )
    }

    /// Short hash-suffixed stand-in for one key segment.
    fn segment_token(&self, raw: &str) -> Result<String> {
        derive_unique_name(
            raw,
            "",
            self.config.key_segment_len,
            self.config.hash_suffix_len,
        )
    }
}

/// Fail with [`Error::EmptyName`] unless `raw` keeps an identifier character.
fn ensure_nonempty(raw: &str) -> Result<()> {
    normalize(raw).map(|_| ())
}
