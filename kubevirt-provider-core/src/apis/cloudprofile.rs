use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::codec::ProviderObject;

/// Provider specific part of the CloudProfile, maps logical machine images
/// to the URLs their disks are imported from.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudProfileConfig {
    #[serde(default)]
    pub machine_images: Vec<MachineImages>,
    /// resource limit overrides per machine type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machine_types: Vec<MachineType>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImages {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<MachineImageVersion>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageVersion {
    pub version: String,
    #[serde(rename = "sourceURL", default)]
    pub source_url: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineType {
    pub name: String,
    pub limits: Option<MachineTypeLimits>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineTypeLimits {
    pub cpu: Quantity,
    pub memory: Quantity,
}

impl ProviderObject for CloudProfileConfig {
    const KIND: &'static str = "CloudProfileConfig";
}

impl CloudProfileConfig {
    pub fn find_image_source_url(&self, name: &str, version: &str) -> Option<&str> {
        self.machine_images
            .iter()
            .filter(|image| image.name == name)
            .flat_map(|image| image.versions.iter())
            .find(|image_version| image_version.version == version)
            .map(|image_version| image_version.source_url.as_str())
    }

    pub fn find_machine_type(&self, name: &str) -> Option<&MachineType> {
        self.machine_types.iter().find(|machine_type| machine_type.name == name)
    }
}
