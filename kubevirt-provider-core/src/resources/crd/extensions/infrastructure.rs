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
    kind = "Infrastructure",
    namespaced,
    status = "InfrastructureResourceStatus",
    derive = "Default"
)]
pub struct InfrastructureSpec {
    #[serde(rename = "type")]
    pub extension_type: String,
    /// raw `InfrastructureConfig`
    pub provider_config: Option<Value>,
    pub region: String,
    /// secret holding the provider cluster kubeconfig
    pub secret_ref: SecretReference,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureResourceStatus {
    /// raw `InfrastructureStatus`
    pub provider_status: Option<Value>,
    pub observed_generation: Option<i64>,
}
