//! Resource payloads

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::links::{Link, LinkSet};
use crate::media::rel;

/// Treat an explicit JSON `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Paged collection envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Collection<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub collection: Vec<T>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    #[serde(rename = "totalSize", default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

impl<T> Collection<T> {
    /// URL of the next page, if the server advertised one
    #[must_use]
    pub fn next_href(&self) -> Option<&str> {
        self.links.find_rel(rel::NEXT).and_then(|l| l.href.as_deref())
    }
}

/// Virtual machine
///
/// Only the fields the inventory reasons about are typed. Everything else
/// the API returns is kept verbatim in `attributes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualMachineDto {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// User-defined custom variables
    #[serde(default, deserialize_with = "null_as_default")]
    pub variables: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl VirtualMachineDto {
    /// Check whether the VM has never been deployed
    #[must_use]
    pub fn is_not_allocated(&self) -> bool {
        self.state.as_deref() == Some(crate::media::STATE_NOT_ALLOCATED)
    }
}

/// Network interface attached to a virtual machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NicDto {
    /// Position of the NIC on the VM (`nic0`, `nic1`, ...)
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl NicDto {
    /// All fields except links, as they appeared on the wire
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, Value> {
        let mut fields = self.attributes.clone();
        fields.insert("sequence".to_string(), Value::from(self.sequence));
        if let Some(ip) = &self.ip {
            fields.insert("ip".to_string(), Value::from(ip.as_str()));
        }
        fields
    }

    /// Title of the network this NIC is plugged into
    ///
    /// Private networks take precedence over external, external over public.
    #[must_use]
    pub fn network_name(&self) -> Option<&str> {
        [rel::PRIVATE_NETWORK, rel::EXTERNAL_NETWORK, rel::PUBLIC_NETWORK]
            .iter()
            .find_map(|r| self.links.find_rel(r))
            .and_then(|l| l.title.as_deref())
    }
}

/// Hard disk or volume attached to a virtual machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskDto {
    /// Boot order of the disk (`disk0`, `disk1`, ...)
    pub sequence: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl DiskDto {
    /// All fields except links, as they appeared on the wire
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, Value> {
        let mut fields = self.attributes.clone();
        fields.insert("sequence".to_string(), Value::from(self.sequence));
        fields
    }
}
