//! Core types for inventory reconciliation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One host as reported by the external inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub name: String,

    /// Durable identity of the host; survives upstream renames.
    #[serde(rename = "hardwareUUID", alias = "hardwareUuid")]
    pub hardware_uuid: String,
}

impl HostInfo {
    pub fn new(name: impl Into<String>, hardware_uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardware_uuid: hardware_uuid.into(),
        }
    }
}

/// One cluster as reported by the external inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<HostInfo>,
}

impl ClusterInfo {
    pub fn new(name: impl Into<String>, hosts: Vec<HostInfo>) -> Self {
        Self {
            name: name.into(),
            hosts,
        }
    }
}

/// Kind of managed object. Each kind is its own key space in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Cluster,
    Host,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Address of a managed object: its kind plus its derived key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub key: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.key)
    }
}

/// A cluster or host mirrored into the control plane's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedObject {
    pub kind: ObjectKind,
    pub key: String,
    /// Credential scope the object was read under.
    pub scope: String,
    /// Name as reported upstream.
    pub display_name: String,
    /// Key of the owning cluster. Hosts only.
    pub owner: Option<String>,
    /// Hosts only.
    pub hardware_uuid: Option<String>,
}

impl ManagedObject {
    /// Build a cluster object.
    pub fn cluster(
        key: impl Into<String>,
        scope: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ObjectKind::Cluster,
            key: key.into(),
            scope: scope.into(),
            display_name: display_name.into(),
            owner: None,
            hardware_uuid: None,
        }
    }

    /// Build a host object owned by `owner`.
    pub fn host(
        key: impl Into<String>,
        scope: impl Into<String>,
        owner: impl Into<String>,
        info: &HostInfo,
    ) -> Self {
        Self {
            kind: ObjectKind::Host,
            key: key.into(),
            scope: scope.into(),
            display_name: info.name.clone(),
            owner: Some(owner.into()),
            hardware_uuid: Some(info.hardware_uuid.clone()),
        }
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind, self.key.clone())
    }

    /// Whether any content field differs from `other`. Keys are not compared.
    pub fn drifted_from(&self, other: &Self) -> bool {
        self.display_name != other.display_name
            || self.owner != other.owner
            || self.hardware_uuid != other.hardware_uuid
            || self.scope != other.scope
    }
}

/// Objects a snapshot says should exist, in creation order.
///
/// Every cluster precedes its hosts.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    objects: Vec<ManagedObject>,
    seen: HashSet<ObjectRef>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object. Returns `false` and ignores it if its ref is taken.
    pub fn add(&mut self, object: ManagedObject) -> bool {
        if !self.seen.insert(object.object_ref()) {
            return false;
        }
        self.objects.push(object);
        true
    }

    pub fn contains(&self, object_ref: &ObjectRef) -> bool {
        self.seen.contains(object_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagedObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Objects currently present in the store for one scope.
#[derive(Debug, Clone, Default)]
pub struct ActualState {
    objects: BTreeMap<ObjectRef, ManagedObject>,
}

impl ActualState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object_ref: &ObjectRef) -> Option<&ManagedObject> {
        self.objects.get(object_ref)
    }

    /// Objects absent from `desired` of the given kind, ordered by key.
    pub fn stale<'a>(&'a self, desired: &DesiredState, kind: ObjectKind) -> Vec<&'a ManagedObject> {
        self.objects
            .iter()
            .filter(|(r, _)| r.kind == kind && !desired.contains(r))
            .map(|(_, o)| o)
            .collect_vec()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl FromIterator<ManagedObject> for ActualState {
    fn from_iter<I: IntoIterator<Item = ManagedObject>>(iter: I) -> Self {
        Self {
            objects: iter.into_iter().map(|o| (o.object_ref(), o)).collect(),
        }
    }
}

/// A single store mutation the syncer decided on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    Create { object: ManagedObject },
    Update { object: ManagedObject },
    Delete { object_ref: ObjectRef },
}

impl ReconcileAction {
    /// The object this action targets.
    pub fn object_ref(&self) -> ObjectRef {
        match self {
            Self::Create { object } | Self::Update { object } => object.object_ref(),
            Self::Delete { object_ref } => object_ref.clone(),
        }
    }

    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::Create { object } => {
                format!("create {} ({})", object.object_ref(), object.display_name)
            }
            Self::Update { object } => {
                format!("update {} ({})", object.object_ref(), object.display_name)
            }
            Self::Delete { object_ref } => format!("delete {object_ref}"),
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub scope: String,
    /// Mutations applied, in order.
    pub actions: Vec<ReconcileAction>,
    pub desired_count: usize,
    pub actual_count: usize,
    /// True when the store already matched the snapshot.
    pub converged: bool,
}

impl SyncReport {
    pub fn new(
        scope: impl Into<String>,
        actions: Vec<ReconcileAction>,
        desired_count: usize,
        actual_count: usize,
    ) -> Self {
        let converged = actions.is_empty();
        Self {
            scope: scope.into(),
            actions,
            desired_count,
            actual_count,
            converged,
        }
    }

    /// Count actions matching a predicate.
    pub fn count(&self, pred: impl Fn(&ReconcileAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}
