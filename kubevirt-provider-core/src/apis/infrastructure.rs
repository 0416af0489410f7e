use serde::{Deserialize, Serialize};

use super::codec::ProviderObject;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureConfig {
    #[serde(default)]
    pub networks: NetworksConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworksConfig {
    /// existing networks that can be shared between multiple clusters, e.g. storage networks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_networks: Vec<NetworkAttachmentDefinitionReference>,
    /// networks that are only used by this cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tenant_networks: Vec<TenantNetwork>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAttachmentDefinitionReference {
    pub name: String,
    /// defaults to the namespace of the provider cluster kubeconfig
    #[serde(default)]
    pub namespace: String,
}

impl NetworkAttachmentDefinitionReference {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantNetwork {
    pub name: String,
    /// raw CNI configuration of the network
    pub config: String,
    #[serde(default)]
    pub default: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    #[serde(default)]
    pub networks: Vec<NetworkStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    /// `<namespace>/<name>` of the realized network
    pub name: String,
    #[serde(default)]
    pub default: bool,
    /// SHA-256 checksum of the network configuration
    #[serde(default)]
    pub sha: String,
}

impl ProviderObject for InfrastructureConfig {
    const KIND: &'static str = "InfrastructureConfig";
}

impl ProviderObject for InfrastructureStatus {
    const KIND: &'static str = "InfrastructureStatus";
}

impl InfrastructureStatus {
    /// Flattened `[name, default, sha]` triples of every realized network.
    pub fn network_identity(&self) -> Vec<String> {
        self.networks
            .iter()
            .flat_map(|network| {
                [
                    network.name.clone(),
                    network.default.to_string(),
                    network.sha.clone(),
                ]
            })
            .collect()
    }

    pub fn contains_network(&self, name: &str) -> bool {
        self.networks.iter().any(|network| network.name == name)
    }
}
