use k8s_openapi::{api::core::v1::PodDNSConfig, apimachinery::pkg::api::resource::Quantity};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::codec::ProviderObject;

/// Name of the disk that carries the machine image, exempt from the data volume correspondence.
pub const ROOT_DISK_NAME: &str = "root-disk";

pub const DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET: &str = "ClusterFirstWithHostNet";
pub const DNS_POLICY_CLUSTER_FIRST: &str = "ClusterFirst";
pub const DNS_POLICY_DEFAULT: &str = "Default";
pub const DNS_POLICY_NONE: &str = "None";

/// Virtual machine configuration of a single worker pool.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerConfig {
    /// CPU topology of the virtual machines
    pub cpu: Option<Cpu>,
    /// memory features like huge pages and guest memory
    pub memory: Option<Memory>,
    /// one of `ClusterFirstWithHostNet`, `ClusterFirst`, `Default` or `None`
    pub dns_policy: Option<String>,
    /// merged into the configuration generated from the DNS policy
    #[serde(rename = "dnsConfig")]
    pub dns_config: Option<PodDNSConfig>,
    #[serde(default)]
    pub disable_pre_allocated_data_volumes: bool,
    /// account the guest management overhead only in the memory limit
    #[serde(default)]
    pub overcommit_guest_overhead: bool,
    pub devices: Option<Devices>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub cores: Option<u32>,
    pub sockets: Option<u32>,
    pub threads: Option<u32>,
    pub model: Option<String>,
    pub dedicated_cpu_placement: Option<bool>,
    pub isolate_emulator_thread: Option<bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub guest: Option<Quantity>,
    pub hugepages: Option<Hugepages>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hugepages {
    pub page_size: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Devices {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<Disk>,
    #[serde(rename = "networkInterfaceMultiqueue")]
    pub network_interface_multi_queue: Option<bool>,
    pub block_multi_queue: Option<bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Disk {
    /// either the root disk name or the name of one of the pool's data volumes
    pub name: String,
    /// assigned by the machine controller, must not be set
    pub boot_order: Option<u32>,
    pub serial: Option<String>,
    pub cache: Option<String>,
    pub io: Option<String>,
    #[serde(rename = "dedicatedIOThread")]
    pub dedicated_io_thread: Option<bool>,
    pub disk: Option<DiskTarget>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiskTarget {
    pub bus: Option<String>,
    pub readonly: Option<bool>,
    pub pci_address: Option<String>,
}

/// Worker provider status, keeps every machine image that was ever resolved
/// so that later reconciles can recover images removed from the cloud profile.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_images: Vec<MachineImage>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImage {
    pub name: String,
    pub version: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
}

impl ProviderObject for WorkerConfig {
    const KIND: &'static str = "WorkerConfig";
}

impl ProviderObject for WorkerStatus {
    const KIND: &'static str = "WorkerStatus";
}

pub fn find_machine_image<'a>(
    images: &'a [MachineImage],
    name: &str,
    version: &str,
) -> Option<&'a MachineImage> {
    images
        .iter()
        .find(|image| image.name == name && image.version == version)
}

/// Appends `image` unless an image with the same name and version is already
/// present, the first occurrence wins.
pub fn append_machine_image(images: &mut Vec<MachineImage>, image: MachineImage) {
    if find_machine_image(images, &image.name, &image.version).is_none() {
        images.push(image);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn image(name: &str, version: &str, url: &str) -> MachineImage {
        MachineImage {
            name: name.to_owned(),
            version: version.to_owned(),
            source_url: url.to_owned(),
        }
    }

    #[test]
    fn append_machine_image_keeps_first_occurrence() {
        let mut images = vec![image("ubuntu", "18.04", "https://a")];

        append_machine_image(&mut images, image("ubuntu", "18.04", "https://b"));
        append_machine_image(&mut images, image("ubuntu", "20.04", "https://c"));

        assert_eq!(
            images,
            vec![
                image("ubuntu", "18.04", "https://a"),
                image("ubuntu", "20.04", "https://c"),
            ]
        );
    }

    #[test]
    fn worker_config_reads_kubevirt_field_names() {
        let config: WorkerConfig = serde_json::from_value(json!({
            "dnsPolicy": "None",
            "dnsConfig": { "nameservers": ["8.8.8.8"] },
            "disablePreAllocatedDataVolumes": true,
            "devices": {
                "disks": [{ "name": "root-disk", "dedicatedIOThread": true }],
                "networkInterfaceMultiqueue": true
            }
        }))
        .unwrap();

        let devices = config.devices.unwrap();
        assert!(config.disable_pre_allocated_data_volumes);
        assert_eq!(config.dns_policy.as_deref(), Some(DNS_POLICY_NONE));
        assert_eq!(devices.network_interface_multi_queue, Some(true));
        assert_eq!(devices.disks[0].dedicated_io_thread, Some(true));
    }
}
