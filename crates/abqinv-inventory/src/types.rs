//! Inventory type definitions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use abqinv_api::{DiskDto, NicDto, VirtualMachineDto};

use crate::error::InventoryError;

/// Flattened variables of a single host
pub type HostVars = BTreeMap<String, Value>;

/// Key of the metadata section in the inventory document
pub const META_KEY: &str = "_meta";

// ============================================================================
// Virtual machine records
// ============================================================================

/// A virtual machine together with its fetched relations
#[derive(Debug, Clone, Default)]
pub struct VirtualMachineRecord {
    /// The VM as listed by the API
    pub vm: VirtualMachineDto,
    /// Network interfaces, in API order
    pub nics: Vec<NicDto>,
    /// Hard disks followed by volumes
    pub disks: Vec<DiskDto>,
    /// Template the VM was deployed from, without its links
    pub template: Option<Value>,
    /// User metadata, when requested
    pub metadata: Option<Value>,
}

impl VirtualMachineRecord {
    /// Wrap a listed VM with no relations fetched yet
    #[must_use]
    pub fn new(vm: VirtualMachineDto) -> Self {
        Self {
            vm,
            ..Default::default()
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Meta {
    #[serde(default)]
    hostvars: BTreeMap<String, HostVars>,
}

/// A complete inventory document
///
/// Serializes to the Ansible dynamic inventory format:
/// `{"_meta": {"hostvars": {...}}, "<group>": ["<host>", ...], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(rename = "_meta", default)]
    meta: Meta,
    #[serde(flatten)]
    groups: BTreeMap<String, Vec<String>>,
}

impl InventorySnapshot {
    /// Snapshot with no groups and no hosts
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Groups and their hosts
    #[must_use]
    pub fn groups(&self) -> &BTreeMap<String, Vec<String>> {
        &self.groups
    }

    /// Hosts of a single group
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Variables of every host
    #[must_use]
    pub fn hostvars(&self) -> &BTreeMap<String, HostVars> {
        &self.meta.hostvars
    }

    /// Variables of a single host
    #[must_use]
    pub fn host(&self, address: &str) -> Option<&HostVars> {
        self.meta.hostvars.get(address)
    }

    /// Check if the snapshot has no hosts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta.hostvars.is_empty() && self.groups.is_empty()
    }

    /// Render as indented JSON
    ///
    /// # Errors
    /// Returns an error if a host variable cannot be serialized.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Find a group host that has no variables
    fn dangling_host(&self) -> Option<(&str, &str)> {
        self.groups.iter().find_map(|(group, hosts)| {
            hosts
                .iter()
                .find(|h| !self.meta.hostvars.contains_key(*h))
                .map(|h| (group.as_str(), h.as_str()))
        })
    }
}

/// Accumulates groups and host variables into a snapshot
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    groups: BTreeMap<String, Vec<String>>,
    hostvars: BTreeMap<String, HostVars>,
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host to a group, creating the group on first use
    ///
    /// A host already in the group is not added twice. The reserved `_meta`
    /// key is rejected.
    pub fn add_to_group(&mut self, group: &str, host: &str) {
        if group == META_KEY {
            warn!(host, "refusing to create reserved group '_meta'");
            return;
        }
        let hosts = self.groups.entry(group.to_string()).or_default();
        if !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
    }

    /// Set the variables of a host, replacing earlier ones
    pub fn set_vars(&mut self, host: &str, vars: HostVars) {
        if self.hostvars.insert(host.to_string(), vars).is_some() {
            warn!(host, "host address shared by several VMs, keeping the last one's variables");
        }
    }

    /// Number of hosts with variables so far
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.hostvars.len()
    }

    /// Finish the snapshot
    ///
    /// # Errors
    /// Returns an error if a grouped host has no variables.
    pub fn finish(self) -> Result<InventorySnapshot, InventoryError> {
        let snapshot = InventorySnapshot {
            meta: Meta {
                hostvars: self.hostvars,
            },
            groups: self.groups,
        };
        if let Some((group, host)) = snapshot.dangling_host() {
            return Err(InventoryError::Invariant(format!(
                "host {host} in group {group} has no hostvars"
            )));
        }
        Ok(snapshot)
    }
}
