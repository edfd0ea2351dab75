//! Inventory building
//!
//! Lists the virtual machines, fetches their relations one VM at a time in
//! listing order, and accumulates the groups and host variables.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use abqinv_api::media::{self, rel};
use abqinv_api::{LinkSet, VirtualMachineDto};
use abqinv_client::{ClientError, CloudApi};

use crate::error::InventoryError;
use crate::flatten::{self, Groupings};
use crate::sanitize::sanitize;
use crate::types::{InventorySnapshot, SnapshotBuilder, VirtualMachineRecord};

/// Filtering and enrichment options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Only include VMs with a public IP, addressed by it
    pub public_ip_only: bool,
    /// Skip VMs that have not been deployed
    pub deployed_only: bool,
    /// Link relation whose title is the VM address when not `public_ip_only`
    pub default_net_interface: String,
    /// Fetch user metadata into `abq_metadata`
    pub get_metadata: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            public_ip_only: false,
            deployed_only: true,
            default_net_interface: "nic0".to_string(),
            get_metadata: false,
        }
    }
}

/// States of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Fetching,
    PerVmProcessing,
    Finalized,
    Failed,
}

impl BuildState {
    /// Check whether moving to `next` is a legal transition
    #[must_use]
    pub fn can_transition_to(self, next: BuildState) -> bool {
        use BuildState::{Failed, Fetching, Finalized, Idle, PerVmProcessing};
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Fetching, PerVmProcessing)
                | (PerVmProcessing, Finalized)
                | (Idle | Fetching | PerVmProcessing, Failed)
        )
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildState::Idle => write!(f, "idle"),
            BuildState::Fetching => write!(f, "fetching"),
            BuildState::PerVmProcessing => write!(f, "per_vm_processing"),
            BuildState::Finalized => write!(f, "finalized"),
            BuildState::Failed => write!(f, "failed"),
        }
    }
}

/// Builds inventory snapshots from a cloud API
pub struct InventoryBuilder {
    api: Arc<dyn CloudApi>,
    options: BuildOptions,
    state: BuildState,
}

impl InventoryBuilder {
    /// Create a new builder
    pub fn new(api: Arc<dyn CloudApi>, options: BuildOptions) -> Self {
        Self {
            api,
            options,
            state: BuildState::Idle,
        }
    }

    /// Current state of the last (or running) build
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    fn transition_to(&mut self, next: BuildState) {
        if !self.state.can_transition_to(next) {
            warn!(from = %self.state, to = %next, "unexpected build state transition");
        }
        debug!(from = %self.state, to = %next, "build state transition");
        self.state = next;
    }

    /// Build a snapshot
    ///
    /// # Errors
    /// Returns an error if listing the VMs or fetching any VM's NICs, disks
    /// or template fails. A VM without a template link is not a failure. No
    /// partial snapshot is ever returned.
    #[instrument(skip(self))]
    pub async fn build(&mut self) -> Result<InventorySnapshot, InventoryError> {
        self.state = BuildState::Idle;
        match self.run().await {
            Ok(snapshot) => {
                self.transition_to(BuildState::Finalized);
                Ok(snapshot)
            }
            Err(e) => {
                self.transition_to(BuildState::Failed);
                Err(e)
            }
        }
    }

    /// Build a snapshot, falling back to an empty one on failure
    pub async fn build_or_empty(&mut self) -> InventorySnapshot {
        match self.build().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "inventory build failed, returning empty inventory");
                InventorySnapshot::empty()
            }
        }
    }

    async fn run(&mut self) -> Result<InventorySnapshot, InventoryError> {
        self.transition_to(BuildState::Fetching);
        let vms = self
            .api
            .virtual_machines()
            .await
            .map_err(|e| InventoryError::ListFailed(e.to_string()))?;
        info!(vms = vms.len(), "listed virtual machines");

        self.transition_to(BuildState::PerVmProcessing);
        let mut snapshot = SnapshotBuilder::new();
        for vm in vms {
            if vm.name.is_empty() {
                return Err(InventoryError::MalformedRecord(
                    "virtual machine without a name".to_string(),
                ));
            }
            let record = self.enrich(vm).await?;
            self.process(&mut snapshot, &record);
        }

        info!(hosts = snapshot.host_count(), "inventory built");
        snapshot.finish()
    }

    /// Fetch the relations of a VM
    async fn enrich(&self, vm: VirtualMachineDto) -> Result<VirtualMachineRecord, InventoryError> {
        let nics = self
            .api
            .nics(&vm)
            .await
            .map_err(|e| enrich_failed(&vm, rel::NICS, &e))?;
        let mut disks = self
            .api
            .hard_disks(&vm)
            .await
            .map_err(|e| enrich_failed(&vm, rel::HARD_DISKS, &e))?;
        let volumes = self
            .api
            .volumes(&vm)
            .await
            .map_err(|e| enrich_failed(&vm, rel::VOLUMES, &e))?;
        disks.extend(volumes);

        let template = match self.api.template(&vm).await {
            Ok(template) => Some(without_links(template)),
            Err(e) if e.is_missing_link() => {
                debug!(vm = %vm.name, "no template");
                None
            }
            Err(e) => return Err(enrich_failed(&vm, rel::TEMPLATE, &e)),
        };

        let metadata = if self.options.get_metadata {
            self.api
                .metadata(&vm)
                .await
                .inspect_err(|e| debug!(vm = %vm.name, error = %e, "metadata unavailable"))
                .ok()
        } else {
            None
        };

        Ok(VirtualMachineRecord {
            vm,
            nics,
            disks,
            template,
            metadata,
        })
    }

    /// Address the VM is reachable at, if it should be in the inventory
    fn address(&self, vm: &VirtualMachineDto) -> Option<String> {
        let link = if self.options.public_ip_only {
            vm.links.iter().find(|l| {
                l.rel == rel::IP && l.media_type.as_deref() == Some(media::PUBLIC_IP)
            })
        } else {
            vm.links.find_rel(&self.options.default_net_interface)
        };
        link.and_then(|l| l.title.clone())
    }

    fn process(&self, snapshot: &mut SnapshotBuilder, record: &VirtualMachineRecord) {
        let vm = &record.vm;

        let Some(address) = self.address(vm) else {
            debug!(vm = %vm.name, "no address, skipping");
            return;
        };
        if self.options.deployed_only && vm.is_not_allocated() {
            debug!(vm = %vm.name, "not deployed, skipping");
            return;
        }

        let (vars, groupings) = flatten::flatten(record);
        snapshot.set_vars(&address, vars);
        for group in group_keys(vm, &groupings) {
            snapshot.add_to_group(&group, &address);
        }
        debug!(vm = %vm.name, %address, "added host");
    }
}

fn enrich_failed(vm: &VirtualMachineDto, relation: &'static str, e: &ClientError) -> InventoryError {
    error!(vm = %vm.name, relation, error = %e, "failed to fetch relation");
    InventoryError::EnrichFailed {
        vm: vm.name.clone(),
        relation,
        message: e.to_string(),
    }
}

fn without_links(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        map.remove("links");
    }
    value
}

/// Every group a host belongs to, in a fixed order
fn group_keys(vm: &VirtualMachineDto, groupings: &Groupings) -> Vec<String> {
    let title = |r: &str| {
        vm.links
            .find_rel(r)
            .and_then(|l| l.title.as_deref())
            .map(sanitize)
    };
    let template = title(rel::TEMPLATE);
    let vapp = title(rel::VIRTUAL_APPLIANCE);
    let vdc = title(rel::VIRTUAL_DATACENTER);
    let hwprof = title(rel::HARDWARE_PROFILE).filter(|h| !h.is_empty());

    let mut keys = vec![vm.name.clone()];
    if let Some(template) = &template {
        keys.push(format!("template_{template}"));
    }
    if let Some(vapp) = &vapp {
        keys.push(format!("vapp_{vapp}"));
    }
    if let Some(vdc) = &vdc {
        keys.push(format!("vdc_{vdc}"));
    }
    if let (Some(vdc), Some(vapp)) = (&vdc, &vapp) {
        keys.push(format!("vdc_{vdc}_vapp_{vapp}"));
    }
    if let Some(hwprof) = &hwprof {
        keys.push(format!("hwprof_{hwprof}"));
    }
    for (name, value) in &vm.variables {
        keys.push(format!("var_{}_{}", sanitize(name), sanitize(value)));
    }

    let prefixed = [
        ("network", &groupings.networks),
        ("dstier", &groupings.storage_tiers),
        ("firewall", &groupings.firewalls),
        ("loadbalancer", &groupings.load_balancers),
    ];
    for (prefix, names) in prefixed {
        keys.extend(names.iter().map(|n| format!("{prefix}_{}", sanitize(n))));
    }
    keys
}
