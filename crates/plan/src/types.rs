//! Migration plan model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered batches of VM names. Batches run in order, VMs within a batch together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmBatches(Vec<Vec<String>>);

impl VmBatches {
    /// Create batches from nested name lists.
    pub const fn new(batches: Vec<Vec<String>>) -> Self {
        Self(batches)
    }

    /// Total number of VM names across every batch.
    pub fn total_vm_count(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// Iterate batches in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &[String]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Number of batches.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no batches at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for VmBatches {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|batch| batch.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

/// Per-VM overrides. Only meaningful when a plan targets exactly one VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedOptions {
    /// Destination volume types, one per source disk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granular_volume_types: Vec<String>,

    /// Destination networks, one per source NIC.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granular_networks: Vec<String>,

    /// Destination ports, one per source NIC.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub granular_ports: Vec<String>,
}

impl AdvancedOptions {
    /// Whether any override field carries a value.
    pub fn is_set(&self) -> bool {
        !(self.granular_volume_types.is_empty()
            && self.granular_networks.is_empty()
            && self.granular_ports.is_empty())
    }
}

/// The part of a migration plan checked at admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlanSpec {
    /// Earliest moment the final switch-over may start.
    pub cutover_start: DateTime<Utc>,

    /// Latest moment the final switch-over may start.
    pub cutover_end: DateTime<Utc>,

    #[serde(default)]
    pub advanced_options: AdvancedOptions,

    #[serde(default)]
    pub virtual_machines: VmBatches,
}

impl MigrationPlanSpec {
    /// Create a plan with no advanced options.
    pub const fn new(
        cutover_start: DateTime<Utc>,
        cutover_end: DateTime<Utc>,
        virtual_machines: VmBatches,
    ) -> Self {
        Self {
            cutover_start,
            cutover_end,
            advanced_options: AdvancedOptions {
                granular_volume_types: Vec::new(),
                granular_networks: Vec::new(),
                granular_ports: Vec::new(),
            },
            virtual_machines,
        }
    }

    /// Attach advanced options.
    #[must_use]
    pub fn with_advanced_options(mut self, options: AdvancedOptions) -> Self {
        self.advanced_options = options;
        self
    }
}
