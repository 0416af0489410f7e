use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the CRD installed by Multus, probed before listing networks.
pub const NETWORK_ATTACHMENT_DEFINITION_CRD_NAME: &str =
    "network-attachment-definitions.k8s.cni.cncf.io";

#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "k8s.cni.cncf.io",
    version = "v1",
    kind = "NetworkAttachmentDefinition",
    namespaced,
    derive = "Default",
    derive = "PartialEq"
)]
pub struct NetworkAttachmentDefinitionSpec {
    /// raw CNI configuration
    #[serde(default)]
    pub config: String,
}
