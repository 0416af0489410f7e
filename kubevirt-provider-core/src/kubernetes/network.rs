use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    api::{DeleteParams, PostParams},
    core::ObjectMeta,
    Api, Client,
};
use log::{info, warn};

use crate::resources::{
    crd::kubevirt::network_attachment::{
        NetworkAttachmentDefinition, NetworkAttachmentDefinitionSpec,
        NETWORK_ATTACHMENT_DEFINITION_CRD_NAME,
    },
    labels::get_listparams,
};

use super::{
    client_cache::{ClientCache, ClientFactory, KubeClientFactory},
    is_not_found,
    retry::{retry_on_conflict, Backoff},
    ManagerError,
};

/// Manages network attachment definitions in the provider cluster.
#[async_trait]
pub trait NetworkManager: Send + Sync {
    /// Creates or updates the definition `name` in the kubeconfig's namespace,
    /// replacing its labels and config.
    async fn create_or_update_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        config: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError>;

    /// Deletes the definition `name`, succeeding if it's already gone.
    async fn delete_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
    ) -> Result<(), ManagerError>;

    /// Fetches a definition expected to exist, an empty `namespace` means the
    /// kubeconfig's namespace.
    async fn get_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
        namespace: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError>;

    /// Lists the definitions carrying `labels`, empty when the CRD isn't installed.
    async fn list_network_attachment_definitions(
        &self,
        kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NetworkAttachmentDefinition>, ManagerError>;
}

pub struct KubeNetworkManager<F: ClientFactory<Client = Client> = KubeClientFactory> {
    clients: ClientCache<F>,
    backoff: Backoff,
}

impl<F: ClientFactory<Client = Client>> KubeNetworkManager<F> {
    pub fn new(factory: F, backoff: Backoff) -> Self {
        Self {
            clients: ClientCache::new(factory),
            backoff,
        }
    }
}

impl Default for KubeNetworkManager {
    fn default() -> Self {
        Self::new(KubeClientFactory, Backoff::default())
    }
}

#[async_trait]
impl<F: ClientFactory<Client = Client>> NetworkManager for KubeNetworkManager<F> {
    async fn create_or_update_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        config: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError> {
        let (client, namespace) = self.clients.get_client(kubeconfig).await?;
        let api: Api<NetworkAttachmentDefinition> = Api::namespaced(client, &namespace);

        retry_on_conflict(&self.backoff, || async {
            match api.get_opt(name).await? {
                Some(existing) => {
                    let mut desired = existing.clone();
                    desired.metadata.labels = Some(labels.clone());
                    desired.spec.config = config.to_owned();

                    if desired == existing {
                        return Ok(existing);
                    }

                    info!("Updating '{name}' NetworkAttachmentDefinition in '{namespace}'...");
                    api.replace(name, &PostParams::default(), &desired).await
                }
                None => {
                    info!("Creating '{name}' NetworkAttachmentDefinition in '{namespace}'...");
                    let definition = NetworkAttachmentDefinition {
                        metadata: ObjectMeta {
                            name: Some(name.to_owned()),
                            namespace: Some(namespace.clone()),
                            labels: Some(labels.clone()),
                            ..Default::default()
                        },
                        spec: NetworkAttachmentDefinitionSpec {
                            config: config.to_owned(),
                        },
                    };

                    api.create(&PostParams::default(), &definition).await
                }
            }
        })
        .await
        .map_err(|err| {
            ManagerError::KubeApiError(
                "create or update NetworkAttachmentDefinition".into(),
                format!("{namespace}/{name}"),
                err,
            )
        })
    }

    async fn delete_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
    ) -> Result<(), ManagerError> {
        let (client, namespace) = self.clients.get_client(kubeconfig).await?;
        let api: Api<NetworkAttachmentDefinition> = Api::namespaced(client, &namespace);

        info!("Deleting '{name}' NetworkAttachmentDefinition in '{namespace}'...");
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(ManagerError::KubeApiError(
                "delete NetworkAttachmentDefinition".into(),
                format!("{namespace}/{name}"),
                err,
            )),
        }
    }

    async fn get_network_attachment_definition(
        &self,
        kubeconfig: &[u8],
        name: &str,
        namespace: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError> {
        let (client, default_namespace) = self.clients.get_client(kubeconfig).await?;
        let namespace = if namespace.is_empty() {
            default_namespace.as_str()
        } else {
            namespace
        };
        let api: Api<NetworkAttachmentDefinition> = Api::namespaced(client, namespace);

        match api.get(name).await {
            Ok(definition) => Ok(definition),
            Err(err) if is_not_found(&err) => Err(ManagerError::NotFound(
                "NetworkAttachmentDefinition",
                format!("{namespace}/{name}"),
            )),
            Err(err) => Err(ManagerError::KubeApiError(
                "get NetworkAttachmentDefinition".into(),
                format!("{namespace}/{name}"),
                err,
            )),
        }
    }

    async fn list_network_attachment_definitions(
        &self,
        kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NetworkAttachmentDefinition>, ManagerError> {
        let (client, namespace) = self.clients.get_client(kubeconfig).await?;

        let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
        let crd = crd_api
            .get_opt(NETWORK_ATTACHMENT_DEFINITION_CRD_NAME)
            .await
            .map_err(|err| {
                ManagerError::KubeApiError(
                    "get CustomResourceDefinition".into(),
                    NETWORK_ATTACHMENT_DEFINITION_CRD_NAME.to_owned(),
                    err,
                )
            })?;

        if crd.is_none() {
            warn!("{NETWORK_ATTACHMENT_DEFINITION_CRD_NAME} CRD is not installed in the provider cluster!");
            return Ok(Vec::new());
        }

        let api: Api<NetworkAttachmentDefinition> = Api::namespaced(client, &namespace);
        let definitions = api.list(&get_listparams(labels)).await.map_err(|err| {
            ManagerError::KubeApiError(
                "list NetworkAttachmentDefinitions".into(),
                namespace.clone(),
                err,
            )
        })?;

        Ok(definitions.items)
    }
}
