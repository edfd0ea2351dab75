//! abqinv-inventory: Ansible inventory from Abiquo virtual machines
//!
//! Turns the virtual machines visible through a [`CloudApi`] into an
//! [`InventorySnapshot`]: groups of host addresses keyed by template,
//! virtual appliance, datacenter, network, firewall, ... plus per-host
//! variables. Snapshots can be persisted in a TTL-gated [`CacheStore`].
//!
//! [`CloudApi`]: abqinv_client::CloudApi

pub mod builder;
pub mod cache;
pub mod error;
pub mod flatten;
pub mod sanitize;
pub mod types;

pub use builder::{BuildOptions, BuildState, InventoryBuilder};
pub use cache::CacheStore;
pub use error::InventoryError;
pub use sanitize::sanitize;
pub use types::{HostVars, InventorySnapshot, SnapshotBuilder, VirtualMachineRecord};
