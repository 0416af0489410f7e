use std::collections::BTreeMap;

use data_encoding::DecodeError;
use k8s_openapi::{
    api::core::v1::{SecretReference, Taint},
    apimachinery::pkg::util::intstr::IntOrString,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

use crate::resources::crd::decode_bytes;

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Worker",
    namespaced,
    status = "WorkerResourceStatus",
    derive = "Default"
)]
pub struct WorkerSpec {
    #[serde(rename = "type")]
    pub extension_type: String,
    pub provider_config: Option<Value>,
    pub region: String,
    /// secret holding the provider cluster kubeconfig
    pub secret_ref: SecretReference,
    /// base64 encoded public key installed on every machine
    pub ssh_public_key: Option<String>,
    /// raw `InfrastructureStatus` written by the infrastructure actuator
    pub infrastructure_provider_status: Option<Value>,
    #[serde(default)]
    pub pools: Vec<WorkerPool>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerPool {
    pub name: String,
    pub machine_type: String,
    pub machine_image: MachineImageReference,
    pub minimum: i32,
    pub maximum: i32,
    pub max_surge: IntOrString,
    pub max_unavailable: IntOrString,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub taints: Vec<Taint>,
    /// raw `WorkerConfig`
    pub provider_config: Option<Value>,
    /// base64 encoded cloud-config of the machines
    #[serde(default)]
    pub user_data: String,
    pub volume: Option<WorkerVolume>,
    #[serde(default)]
    pub data_volumes: Vec<WorkerDataVolume>,
    pub kubernetes_version: Option<String>,
    #[serde(default)]
    pub zones: Vec<String>,
    pub machine_controller_manager: Option<MachineControllerManagerSettings>,
    pub cri: Option<Cri>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageReference {
    pub name: String,
    pub version: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerVolume {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub volume_type: Option<String>,
    pub size: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDataVolume {
    pub name: String,
    #[serde(rename = "type")]
    pub volume_type: Option<String>,
    pub size: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineControllerManagerSettings {
    pub machine_drain_timeout: Option<String>,
    pub machine_health_timeout: Option<String>,
    pub machine_creation_timeout: Option<String>,
    pub max_evict_retries: Option<i32>,
    #[serde(default)]
    pub node_conditions: Vec<String>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cri {
    pub name: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResourceStatus {
    /// raw `WorkerStatus`
    pub provider_status: Option<Value>,
    #[serde(default)]
    pub machine_deployments: Vec<MachineDeploymentStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineDeploymentStatus {
    pub name: String,
    pub minimum: i32,
    pub maximum: i32,
}

impl Worker {
    pub fn ssh_public_key(&self) -> Result<Vec<u8>, DecodeError> {
        match self.spec.ssh_public_key.as_deref() {
            Some(encoded) => decode_bytes(encoded),
            None => Ok(Vec::new()),
        }
    }
}

impl WorkerPool {
    pub fn user_data(&self) -> Result<Vec<u8>, DecodeError> {
        decode_bytes(&self.user_data)
    }
}
