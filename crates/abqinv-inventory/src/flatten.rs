//! Flattening of virtual machine records into host variables
//!
//! Nested relations (NICs, disks, links) become flat `abq_*` variables, and
//! the names of networks, datastore tiers, firewalls and load balancers a VM
//! belongs to are collected for grouping.

use serde_json::Value;

use abqinv_api::media::rel;
use abqinv_api::{DiskDto, Link, LinkSet, NicDto};

use crate::types::{HostVars, VirtualMachineRecord};

/// Prefix every host variable carries
pub const VAR_PREFIX: &str = "abq_";

/// Link relations exported as host variables, by title
pub const RELATION_VARS: [&str; 12] = [
    "category",
    "virtualmachinetemplate",
    "hypervisortype",
    "ip",
    "location",
    "hardwareprofile",
    "state",
    "network_configuration",
    "virtualappliance",
    "virtualdatacenter",
    "user",
    "enterprise",
];

/// Related entities a VM is a member of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Groupings {
    pub networks: Vec<String>,
    pub storage_tiers: Vec<String>,
    pub firewalls: Vec<String>,
    pub load_balancers: Vec<String>,
}

/// Flatten a record into host variables and its group memberships
#[must_use]
pub fn flatten(record: &VirtualMachineRecord) -> (HostVars, Groupings) {
    (host_vars(record), groupings(record))
}

/// Host variables of a record
///
/// Later sources win on key clashes: NICs, then disks, then link relations,
/// then the VM's own attributes.
#[must_use]
pub fn host_vars(record: &VirtualMachineRecord) -> HostVars {
    let mut vars = nic_vars(&record.nics);
    vars.extend(disk_vars(&record.disks));
    vars.extend(relation_vars(&record.vm.links));
    vars.extend(attribute_vars(record));
    namespaced(vars)
}

/// `nic{seq}_{field}` variables plus `nic{seq}_net_type`
#[must_use]
pub fn nic_vars(nics: &[NicDto]) -> HostVars {
    let mut vars = HostVars::new();
    for nic in nics {
        let prefix = format!("nic{}", nic.sequence);
        for (key, value) in nic.fields() {
            vars.insert(format!("{prefix}_{key}"), value);
        }
        if let Some(link) = nic.links.find_rel_containing("network") {
            vars.insert(format!("{prefix}_net_type"), Value::from(link.rel.as_str()));
        }
    }
    vars
}

/// `disk{seq}_{field}` variables plus `disk{seq}_tier`
#[must_use]
pub fn disk_vars(disks: &[DiskDto]) -> HostVars {
    let mut vars = HostVars::new();
    for disk in disks {
        let prefix = format!("disk{}", disk.sequence);
        for (key, value) in disk.fields() {
            vars.insert(format!("{prefix}_{key}"), value);
        }
        if let Some(link) = disk.links.find_rel_containing("tier") {
            vars.insert(format!("{prefix}_tier"), Value::from(link.title_or_empty()));
        }
    }
    vars
}

/// Titles of the first link of each relation in [`RELATION_VARS`]
#[must_use]
pub fn relation_vars(links: &[Link]) -> HostVars {
    RELATION_VARS
        .iter()
        .filter_map(|r| links.find_rel(r))
        .map(|l| (l.rel.clone(), Value::from(l.title_or_empty())))
        .collect()
}

/// The VM's own fields, with fetched template and metadata
fn attribute_vars(record: &VirtualMachineRecord) -> HostVars {
    let vm = &record.vm;
    let mut vars = vm.attributes.clone();
    vars.insert("name".to_string(), Value::from(vm.name.as_str()));
    if let Some(state) = &vm.state {
        vars.insert("state".to_string(), Value::from(state.as_str()));
    }
    if !vm.variables.is_empty() {
        vars.insert(
            "variables".to_string(),
            Value::Object(
                vm.variables
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            ),
        );
    }
    if let Some(template) = &record.template {
        vars.insert("template".to_string(), template.clone());
    }
    if let Some(metadata) = &record.metadata {
        vars.insert("metadata".to_string(), metadata.clone());
    }
    vars
}

fn namespaced(vars: HostVars) -> HostVars {
    vars.into_iter()
        .map(|(key, value)| {
            if key.starts_with(VAR_PREFIX) {
                (key, value)
            } else {
                (format!("{VAR_PREFIX}{key}"), value)
            }
        })
        .collect()
}

/// Networks, datastore tiers, firewalls and load balancers of a record
#[must_use]
pub fn groupings(record: &VirtualMachineRecord) -> Groupings {
    let mut networks: Vec<String> = Vec::new();
    for name in record.nics.iter().filter_map(NicDto::network_name) {
        if !networks.iter().any(|n| n == name) {
            networks.push(name.to_string());
        }
    }

    let links = &record.vm.links;
    Groupings {
        networks,
        storage_tiers: links.distinct_titles(|l| l.rel.starts_with(rel::DATASTORE_TIER_PREFIX)),
        firewalls: links.distinct_titles(|l| l.rel == rel::FIREWALL),
        load_balancers: links.distinct_titles(|l| l.rel == rel::LOAD_BALANCER),
    }
}
