//! The subset of the Gardener `CloudProfile` and `Shoot` objects embedded in
//! the extension `Cluster` resource that the provider reads.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfile {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: CloudProfileSpec,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileSpec {
    #[serde(default)]
    pub machine_images: Vec<CloudProfileMachineImage>,
    #[serde(default)]
    pub machine_types: Vec<CloudProfileMachineType>,
    #[serde(default)]
    pub volume_types: Vec<VolumeType>,
    #[serde(default)]
    pub regions: Vec<Region>,
    pub provider_config: Option<Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileMachineImage {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<CloudProfileImageVersion>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileImageVersion {
    pub version: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileMachineType {
    pub name: String,
    pub cpu: Quantity,
    pub memory: Quantity,
    pub gpu: Option<Quantity>,
    pub storage: Option<MachineTypeStorage>,
    pub usable: Option<bool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MachineTypeStorage {
    /// storage class used for the root volume
    pub class: String,
    #[serde(rename = "size")]
    pub storage_size: Quantity,
    #[serde(rename = "type")]
    pub storage_type: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VolumeType {
    pub name: String,
    pub class: String,
    pub usable: Option<bool>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub name: String,
    #[serde(default)]
    pub zones: Vec<Zone>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub name: String,
}

impl CloudProfileSpec {
    pub fn find_machine_type(&self, name: &str) -> Option<&CloudProfileMachineType> {
        self.machine_types.iter().find(|machine_type| machine_type.name == name)
    }

    pub fn find_volume_type(&self, name: &str) -> Option<&VolumeType> {
        self.volume_types.iter().find(|volume_type| volume_type.name == name)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Shoot {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ShootSpec,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShootSpec {
    #[serde(default)]
    pub kubernetes: KubernetesSettings,
    #[serde(default)]
    pub networking: Networking,
    #[serde(default)]
    pub provider: ShootProvider,
    pub hibernation: Option<Hibernation>,
    #[serde(default)]
    pub region: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesSettings {
    #[serde(default)]
    pub version: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(rename = "type", default)]
    pub network_type: String,
    pub pods: Option<String>,
    pub nodes: Option<String>,
    pub services: Option<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShootProvider {
    #[serde(rename = "type", default)]
    pub provider_type: String,
    pub control_plane_config: Option<Value>,
    pub infrastructure_config: Option<Value>,
    #[serde(default)]
    pub workers: Vec<ShootWorker>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShootWorker {
    pub name: String,
    pub provider_config: Option<Value>,
    #[serde(default)]
    pub data_volumes: Vec<ShootDataVolume>,
    #[serde(default)]
    pub zones: Vec<String>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShootDataVolume {
    pub name: String,
    #[serde(rename = "type")]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub size: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Hibernation {
    pub enabled: Option<bool>,
}

impl Shoot {
    pub fn is_hibernated(&self) -> bool {
        self.spec
            .hibernation
            .as_ref()
            .and_then(|hibernation| hibernation.enabled)
            .unwrap_or(false)
    }
}
