//! Media types, relation names and well-known values

/// Collection of virtual machines
pub const VIRTUAL_MACHINES: &str = "application/vnd.abiquo.virtualmachines+json";

/// Public IP address resource
pub const PUBLIC_IP: &str = "application/vnd.abiquo.publicip+json";

/// Fallback `Accept` header for followed links without a `type`
pub const JSON: &str = "application/json";

/// Path of the cloud virtual machine listing, relative to the API root
pub const VIRTUAL_MACHINES_PATH: &str = "cloud/virtualmachines";

/// State of a virtual machine that has not been deployed
pub const STATE_NOT_ALLOCATED: &str = "NOT_ALLOCATED";

/// Relation names
pub mod rel {
    pub const NICS: &str = "nics";
    pub const HARD_DISKS: &str = "harddisks";
    pub const VOLUMES: &str = "volumes";
    pub const TEMPLATE: &str = "virtualmachinetemplate";
    pub const METADATA: &str = "metadata";
    pub const NEXT: &str = "next";

    pub const VIRTUAL_APPLIANCE: &str = "virtualappliance";
    pub const VIRTUAL_DATACENTER: &str = "virtualdatacenter";
    pub const HARDWARE_PROFILE: &str = "hardwareprofile";
    pub const IP: &str = "ip";
    pub const FIREWALL: &str = "firewall";
    pub const LOAD_BALANCER: &str = "loadbalancer";
    pub const DATASTORE_TIER_PREFIX: &str = "datastoretier";

    pub const PRIVATE_NETWORK: &str = "privatenetwork";
    pub const EXTERNAL_NETWORK: &str = "externalnetwork";
    pub const PUBLIC_NETWORK: &str = "publicnetwork";
}
