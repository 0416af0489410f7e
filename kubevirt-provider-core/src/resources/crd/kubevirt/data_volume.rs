use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{PersistentVolumeClaimSpec, ResourceRequirements},
    apimachinery::pkg::api::resource::Quantity,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// A volume imported by the containerized data importer, used as boot and
/// data disks of the virtual machines.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "cdi.kubevirt.io",
    version = "v1alpha1",
    kind = "DataVolume",
    namespaced,
    derive = "Default",
    derive = "PartialEq"
)]
pub struct DataVolumeSpec {
    pub source: DataVolumeSource,
    pub pvc: Option<PersistentVolumeClaimSpec>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeSource {
    pub http: Option<DataVolumeSourceHttp>,
    pub pvc: Option<DataVolumeSourcePvc>,
    pub blank: Option<DataVolumeBlankImage>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeSourceHttp {
    pub url: String,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataVolumeSourcePvc {
    pub namespace: String,
    pub name: String,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
pub struct DataVolumeBlankImage {}

impl DataVolumeSpec {
    /// Imports the disk image served at `url`.
    pub fn with_http_source(storage_class: &str, size: &Quantity, url: &str) -> Self {
        Self {
            source: DataVolumeSource {
                http: Some(DataVolumeSourceHttp {
                    url: url.to_owned(),
                }),
                ..Default::default()
            },
            pvc: Some(claim_spec(storage_class, size)),
        }
    }

    /// Clones the existing claim `namespace/name`.
    pub fn with_pvc_source(storage_class: &str, size: &Quantity, namespace: &str, name: &str) -> Self {
        Self {
            source: DataVolumeSource {
                pvc: Some(DataVolumeSourcePvc {
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                }),
                ..Default::default()
            },
            pvc: Some(claim_spec(storage_class, size)),
        }
    }

    pub fn with_blank_source(storage_class: &str, size: &Quantity) -> Self {
        Self {
            source: DataVolumeSource {
                blank: Some(DataVolumeBlankImage {}),
                ..Default::default()
            },
            pvc: Some(claim_spec(storage_class, size)),
        }
    }
}

fn claim_spec(storage_class: &str, size: &Quantity) -> PersistentVolumeClaimSpec {
    PersistentVolumeClaimSpec {
        access_modes: Some(vec!["ReadWriteOnce".to_owned()]),
        resources: Some(ResourceRequirements {
            requests: Some(BTreeMap::from([("storage".to_owned(), size.clone())])),
            ..Default::default()
        }),
        storage_class_name: Some(storage_class.to_owned()),
        ..Default::default()
    }
}
