//! abqinv-api: Abiquo wire types
//!
//! Serde representations of the Abiquo API payloads read by the inventory:
//! hyperlinks, virtual machines, NICs, disks and paged collections, plus the
//! media types and relation names used to navigate between them.

pub mod links;
pub mod media;
pub mod resources;

pub use links::{Link, LinkSet};
pub use resources::{Collection, DiskDto, NicDto, VirtualMachineDto};
