//! Read-only view of the Abiquo cloud API

use async_trait::async_trait;
use serde_json::Value;

use abqinv_api::{DiskDto, NicDto, VirtualMachineDto};

use crate::error::ClientError;

#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn virtual_machines(&self) -> Result<Vec<VirtualMachineDto>, ClientError>;
    async fn nics(&self, vm: &VirtualMachineDto) -> Result<Vec<NicDto>, ClientError>;
    async fn hard_disks(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>, ClientError>;
    async fn volumes(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>, ClientError>;
    async fn template(&self, vm: &VirtualMachineDto) -> Result<Value, ClientError>;
    async fn metadata(&self, vm: &VirtualMachineDto) -> Result<Value, ClientError>;
}
