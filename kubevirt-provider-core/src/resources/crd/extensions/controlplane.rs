use k8s_openapi::api::core::v1::SecretReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "ControlPlane",
    namespaced,
    status = "ControlPlaneResourceStatus",
    derive = "Default"
)]
pub struct ControlPlaneSpec {
    #[serde(rename = "type")]
    pub extension_type: String,
    /// raw `ControlPlaneConfig`
    pub provider_config: Option<Value>,
    pub region: String,
    pub secret_ref: SecretReference,
    pub infrastructure_provider_status: Option<Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneResourceStatus {
    pub provider_status: Option<Value>,
}
