use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use abqinv_api::{DiskDto, Link, NicDto, VirtualMachineDto};
use abqinv_client::{ClientError, CloudApi};
use abqinv_inventory::{BuildOptions, BuildState, InventoryBuilder, InventorySnapshot};

const PUBLIC_IP: &str = "application/vnd.abiquo.publicip+json";

// Mock implementation

#[derive(Default)]
struct MockApi {
    vms: Vec<VirtualMachineDto>,
    nics: HashMap<String, Vec<NicDto>>,
    disks: HashMap<String, Vec<DiskDto>>,
    volumes: HashMap<String, Vec<DiskDto>>,
    templates: HashMap<String, Value>,
    metadata: HashMap<String, Value>,
    fail_listing: bool,
    fail_nics_for: Option<String>,
    fail_template_for: Option<String>,
}

fn server_error() -> ClientError {
    ClientError::Api {
        status: 500,
        message: "internal error".to_string(),
    }
}

fn missing(rel: &str, vm: &VirtualMachineDto) -> ClientError {
    ClientError::MissingLink {
        rel: rel.to_string(),
        resource: vm.name.clone(),
    }
}

#[async_trait]
impl CloudApi for MockApi {
    async fn virtual_machines(&self) -> Result<Vec<VirtualMachineDto>, ClientError> {
        if self.fail_listing {
            return Err(ClientError::Api {
                status: 401,
                message: "unauthorized".to_string(),
            });
        }
        Ok(self.vms.clone())
    }

    async fn nics(&self, vm: &VirtualMachineDto) -> Result<Vec<NicDto>, ClientError> {
        if self.fail_nics_for.as_deref() == Some(vm.name.as_str()) {
            return Err(server_error());
        }
        Ok(self.nics.get(&vm.name).cloned().unwrap_or_default())
    }

    async fn hard_disks(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>, ClientError> {
        Ok(self.disks.get(&vm.name).cloned().unwrap_or_default())
    }

    async fn volumes(&self, vm: &VirtualMachineDto) -> Result<Vec<DiskDto>, ClientError> {
        Ok(self.volumes.get(&vm.name).cloned().unwrap_or_default())
    }

    async fn template(&self, vm: &VirtualMachineDto) -> Result<Value, ClientError> {
        if self.fail_template_for.as_deref() == Some(vm.name.as_str()) {
            return Err(server_error());
        }
        self.templates
            .get(&vm.name)
            .cloned()
            .ok_or_else(|| missing("virtualmachinetemplate", vm))
    }

    async fn metadata(&self, vm: &VirtualMachineDto) -> Result<Value, ClientError> {
        self.metadata.get(&vm.name).cloned().ok_or_else(server_error)
    }
}

fn vm(name: &str, state: &str, links: Vec<Link>) -> VirtualMachineDto {
    VirtualMachineDto {
        name: name.to_string(),
        state: Some(state.to_string()),
        links,
        ..Default::default()
    }
}

fn web1(state: &str) -> VirtualMachineDto {
    vm(
        "web1",
        state,
        vec![
            Link::new("virtualmachinetemplate", "Ubuntu"),
            Link::new("virtualdatacenter", "DC1"),
            Link::new("virtualappliance", "App1"),
            Link::new("nic0", "10.0.0.5"),
        ],
    )
}

fn api_with(vms: Vec<VirtualMachineDto>) -> MockApi {
    MockApi {
        vms,
        ..Default::default()
    }
}

async fn build(api: MockApi, options: BuildOptions) -> InventorySnapshot {
    let mut builder = InventoryBuilder::new(Arc::new(api), options);
    builder.build().await.unwrap()
}

fn assert_referentially_complete(snapshot: &InventorySnapshot) {
    for (group, hosts) in snapshot.groups() {
        for host in hosts {
            assert!(
                snapshot.host(host).is_some(),
                "host {host} of group {group} missing from hostvars"
            );
        }
    }
}

#[tokio::test]
async fn test_basic_vm_groups() {
    let snapshot = build(api_with(vec![web1("ALLOCATED")]), BuildOptions::default()).await;

    for group in [
        "web1",
        "template_Ubuntu",
        "vapp_App1",
        "vdc_DC1",
        "vdc_DC1_vapp_App1",
    ] {
        assert_eq!(
            snapshot.group(group),
            Some(&["10.0.0.5".to_string()][..]),
            "group {group}"
        );
    }
    assert_eq!(snapshot.groups().len(), 5);

    let vars = snapshot.host("10.0.0.5").unwrap();
    assert_eq!(vars.get("abq_state"), Some(&json!("ALLOCATED")));
    assert_referentially_complete(&snapshot);
}

#[tokio::test]
async fn test_not_allocated_vm_is_excluded() {
    let snapshot = build(api_with(vec![web1("NOT_ALLOCATED")]), BuildOptions::default()).await;
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_not_allocated_vm_kept_when_not_deployed_only() {
    let options = BuildOptions {
        deployed_only: false,
        ..Default::default()
    };
    let snapshot = build(api_with(vec![web1("NOT_ALLOCATED")]), options).await;
    assert!(snapshot.host("10.0.0.5").is_some());
}

#[tokio::test]
async fn test_vm_without_address_is_excluded() {
    let no_nic = vm(
        "db1",
        "ON",
        vec![
            Link::new("virtualdatacenter", "DC1"),
            Link::new("firewall", "db"),
        ],
    );
    let snapshot = build(api_with(vec![web1("ON"), no_nic]), BuildOptions::default()).await;

    assert!(snapshot.group("db1").is_none());
    assert!(snapshot.group("firewall_db").is_none());
    assert_eq!(snapshot.hostvars().len(), 1);
    assert_eq!(snapshot.group("vdc_DC1").unwrap(), ["10.0.0.5".to_string()]);
    assert_referentially_complete(&snapshot);
}

#[tokio::test]
async fn test_public_ip_only() {
    let public = vm(
        "web2",
        "ON",
        vec![
            Link::new("nic0", "10.0.0.6"),
            Link::new("ip", "10.0.0.6").with_type("application/vnd.abiquo.privateip+json"),
            Link::new("ip", "80.1.2.3").with_type(PUBLIC_IP),
        ],
    );
    let options = BuildOptions {
        public_ip_only: true,
        ..Default::default()
    };
    let snapshot = build(api_with(vec![web1("ON"), public]), options).await;

    assert_eq!(snapshot.hostvars().keys().collect::<Vec<_>>(), vec!["80.1.2.3"]);
    assert_eq!(snapshot.group("web2").unwrap(), ["80.1.2.3".to_string()]);
    // relation vars keep the first "ip" link
    let vars = snapshot.host("80.1.2.3").unwrap();
    assert_eq!(vars.get("abq_ip"), Some(&json!("10.0.0.6")));
}

#[tokio::test]
async fn test_custom_default_interface() {
    let multi = vm(
        "web3",
        "ON",
        vec![Link::new("nic0", "10.0.0.7"), Link::new("nic1", "192.168.1.7")],
    );
    let options = BuildOptions {
        default_net_interface: "nic1".to_string(),
        ..Default::default()
    };
    let snapshot = build(api_with(vec![multi]), options).await;
    assert_eq!(snapshot.group("web3").unwrap(), ["192.168.1.7".to_string()]);
}

#[tokio::test]
async fn test_memberships_become_groups() {
    let mut vm1 = web1("ON");
    vm1.links.extend([
        Link::new("hardwareprofile", "large"),
        Link::new("datastoretier0", "Gold Tier"),
        Link::new("firewall", "web [prod]"),
        Link::new("loadbalancer", "lb/front"),
    ]);
    vm1.variables.insert("role".to_string(), "front end".to_string());

    let mut api = api_with(vec![vm1]);
    api.nics.insert(
        "web1".to_string(),
        vec![NicDto {
            sequence: 0,
            ip: Some("10.0.0.5".to_string()),
            links: vec![Link::new("privatenetwork", "default net")],
            ..Default::default()
        }],
    );
    api.disks.insert(
        "web1".to_string(),
        vec![DiskDto {
            sequence: 0,
            links: vec![Link::new("datastoretier", "Gold Tier")],
            ..Default::default()
        }],
    );
    api.volumes.insert(
        "web1".to_string(),
        vec![DiskDto {
            sequence: 1,
            ..Default::default()
        }],
    );

    let snapshot = build(api, BuildOptions::default()).await;
    for group in [
        "hwprof_large",
        "var_role_front_end",
        "network_default_net",
        "dstier_Gold_Tier",
        "firewall_web_prod",
        "loadbalancer_lb_front",
    ] {
        assert!(snapshot.group(group).is_some(), "missing group {group}");
    }

    let vars = snapshot.host("10.0.0.5").unwrap();
    assert_eq!(vars.get("abq_nic0_net_type"), Some(&json!("privatenetwork")));
    assert_eq!(vars.get("abq_disk0_tier"), Some(&json!("Gold Tier")));
    assert_eq!(vars.get("abq_disk1_sequence"), Some(&json!(1)));
    assert_eq!(vars.get("abq_variables"), Some(&json!({"role": "front end"})));
}

#[tokio::test]
async fn test_template_and_metadata_enrichment() {
    let mut api = api_with(vec![web1("ON")]);
    api.templates.insert(
        "web1".to_string(),
        json!({"name": "Ubuntu", "cpuRequired": 1, "links": [{"rel": "edit"}]}),
    );
    api.metadata
        .insert("web1".to_string(), json!({"metadata": {"owner": "ops"}}));
    let options = BuildOptions {
        get_metadata: true,
        ..Default::default()
    };

    let snapshot = build(api, options).await;
    let vars = snapshot.host("10.0.0.5").unwrap();
    assert_eq!(
        vars.get("abq_template"),
        Some(&json!({"name": "Ubuntu", "cpuRequired": 1}))
    );
    assert_eq!(
        vars.get("abq_metadata"),
        Some(&json!({"metadata": {"owner": "ops"}}))
    );
}

#[tokio::test]
async fn test_metadata_failure_is_ignored() {
    let options = BuildOptions {
        get_metadata: true,
        ..Default::default()
    };
    let snapshot = build(api_with(vec![web1("ON")]), options).await;
    let vars = snapshot.host("10.0.0.5").unwrap();
    assert!(!vars.contains_key("abq_metadata"));
    assert!(!vars.contains_key("abq_template"));
}

#[tokio::test]
async fn test_listing_failure_yields_empty_document() {
    let api = MockApi {
        fail_listing: true,
        ..Default::default()
    };
    let mut builder = InventoryBuilder::new(Arc::new(api), BuildOptions::default());

    assert!(builder.build().await.is_err());
    assert_eq!(builder.state(), BuildState::Failed);

    let snapshot = builder.build_or_empty().await;
    assert_eq!(
        serde_json::to_string(&snapshot).unwrap(),
        r#"{"_meta":{"hostvars":{}}}"#
    );
}

#[tokio::test]
async fn test_enrichment_failure_aborts_whole_build() {
    let other = vm("web2", "ON", vec![Link::new("nic0", "10.0.0.6")]);
    let mut api = api_with(vec![other, web1("ON")]);
    api.fail_nics_for = Some("web1".to_string());
    let mut builder = InventoryBuilder::new(Arc::new(api), BuildOptions::default());

    let err = builder.build().await.unwrap_err();
    assert!(err.is_fetch_error());
    assert!(builder.build_or_empty().await.is_empty());
}

#[tokio::test]
async fn test_template_failure_aborts_whole_build() {
    let mut api = api_with(vec![web1("ON")]);
    api.fail_template_for = Some("web1".to_string());
    let mut builder = InventoryBuilder::new(Arc::new(api), BuildOptions::default());

    let err = builder.build().await.unwrap_err();
    assert!(err.to_string().contains("virtualmachinetemplate"));
    assert_eq!(builder.state(), BuildState::Failed);
}

#[tokio::test]
async fn test_unnamed_vm_is_rejected() {
    let api = api_with(vec![vm("", "ON", vec![Link::new("nic0", "10.0.0.9")])]);
    let mut builder = InventoryBuilder::new(Arc::new(api), BuildOptions::default());
    assert!(builder.build().await.is_err());
}

#[tokio::test]
async fn test_hosts_keep_listing_order() {
    let vms = vec![
        vm("b", "ON", vec![Link::new("nic0", "10.0.0.2"), Link::new("virtualdatacenter", "DC1")]),
        vm("a", "ON", vec![Link::new("nic0", "10.0.0.1"), Link::new("virtualdatacenter", "DC1")]),
        vm("c", "ON", vec![Link::new("nic0", "10.0.0.3"), Link::new("virtualdatacenter", "DC1")]),
    ];
    let snapshot = build(api_with(vms), BuildOptions::default()).await;
    assert_eq!(
        snapshot.group("vdc_DC1").unwrap(),
        ["10.0.0.2".to_string(), "10.0.0.1".to_string(), "10.0.0.3".to_string()]
    );
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let mut first = web1("ON");
    first.variables.insert("tier".to_string(), "web".to_string());
    first.links.push(Link::new("firewall", "fw"));
    let second = vm("db1", "ON", vec![Link::new("nic0", "10.0.0.9")]);

    let api = Arc::new(api_with(vec![first, second]));
    let mut builder = InventoryBuilder::new(api, BuildOptions::default());

    let a = builder.build().await.unwrap().to_json_pretty().unwrap();
    assert_eq!(builder.state(), BuildState::Finalized);
    let b = builder.build().await.unwrap().to_json_pretty().unwrap();
    assert_eq!(a, b);
}
