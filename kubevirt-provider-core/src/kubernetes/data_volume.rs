use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::{
    api::{DeleteParams, PostParams},
    core::ObjectMeta,
    Api, Client,
};
use log::info;

use crate::resources::{
    crd::kubevirt::data_volume::{DataVolume, DataVolumeSpec},
    labels::get_listparams,
};

use super::{
    client_cache::{ClientCache, ClientFactory, KubeClientFactory},
    is_not_found,
    retry::{retry_on_conflict, Backoff},
    ManagerError,
};

/// Manages the boot and data volumes of the virtual machines in the provider cluster.
#[async_trait]
pub trait DataVolumeManager: Send + Sync {
    /// Creates or updates the volume `name`, replacing its labels and spec.
    async fn create_or_update_data_volume(
        &self,
        kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        spec: &DataVolumeSpec,
    ) -> Result<DataVolume, ManagerError>;

    /// Deletes the volume `name`, succeeding if it's already gone.
    async fn delete_data_volume(&self, kubeconfig: &[u8], name: &str) -> Result<(), ManagerError>;

    async fn get_data_volume(
        &self,
        kubeconfig: &[u8],
        name: &str,
    ) -> Result<Option<DataVolume>, ManagerError>;

    async fn list_data_volumes(
        &self,
        kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DataVolume>, ManagerError>;
}

pub struct KubeDataVolumeManager<F: ClientFactory<Client = Client> = KubeClientFactory> {
    clients: ClientCache<F>,
    backoff: Backoff,
}

impl<F: ClientFactory<Client = Client>> KubeDataVolumeManager<F> {
    pub fn new(factory: F, backoff: Backoff) -> Self {
        Self {
            clients: ClientCache::new(factory),
            backoff,
        }
    }

    async fn api(&self, kubeconfig: &[u8]) -> Result<(Api<DataVolume>, String), ManagerError> {
        let (client, namespace) = self.clients.get_client(kubeconfig).await?;

        Ok((Api::namespaced(client, &namespace), namespace))
    }
}

impl Default for KubeDataVolumeManager {
    fn default() -> Self {
        Self::new(KubeClientFactory, Backoff::default())
    }
}

#[async_trait]
impl<F: ClientFactory<Client = Client>> DataVolumeManager for KubeDataVolumeManager<F> {
    async fn create_or_update_data_volume(
        &self,
        kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        spec: &DataVolumeSpec,
    ) -> Result<DataVolume, ManagerError> {
        let (api, namespace) = self.api(kubeconfig).await?;

        retry_on_conflict(&self.backoff, || async {
            match api.get_opt(name).await? {
                Some(existing) => {
                    let mut desired = existing.clone();
                    desired.metadata.labels = Some(labels.clone());
                    desired.spec = spec.clone();

                    if desired == existing {
                        return Ok(existing);
                    }

                    info!("Updating '{name}' DataVolume in '{namespace}'...");
                    api.replace(name, &PostParams::default(), &desired).await
                }
                None => {
                    info!("Creating '{name}' DataVolume in '{namespace}'...");
                    let volume = DataVolume {
                        metadata: ObjectMeta {
                            name: Some(name.to_owned()),
                            namespace: Some(namespace.clone()),
                            labels: Some(labels.clone()),
                            ..Default::default()
                        },
                        spec: spec.clone(),
                    };

                    api.create(&PostParams::default(), &volume).await
                }
            }
        })
        .await
        .map_err(|err| {
            ManagerError::KubeApiError(
                "create or update DataVolume".into(),
                format!("{namespace}/{name}"),
                err,
            )
        })
    }

    async fn delete_data_volume(&self, kubeconfig: &[u8], name: &str) -> Result<(), ManagerError> {
        let (api, namespace) = self.api(kubeconfig).await?;

        info!("Deleting '{name}' DataVolume in '{namespace}'...");
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(err) if is_not_found(&err) => Ok(()),
            Err(err) => Err(ManagerError::KubeApiError(
                "delete DataVolume".into(),
                format!("{namespace}/{name}"),
                err,
            )),
        }
    }

    async fn get_data_volume(
        &self,
        kubeconfig: &[u8],
        name: &str,
    ) -> Result<Option<DataVolume>, ManagerError> {
        let (api, namespace) = self.api(kubeconfig).await?;

        api.get_opt(name).await.map_err(|err| {
            ManagerError::KubeApiError("get DataVolume".into(), format!("{namespace}/{name}"), err)
        })
    }

    async fn list_data_volumes(
        &self,
        kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DataVolume>, ManagerError> {
        let (api, namespace) = self.api(kubeconfig).await?;

        let volumes = api
            .list(&get_listparams(labels))
            .await
            .map_err(|err| ManagerError::KubeApiError("list DataVolumes".into(), namespace, err))?;

        Ok(volumes.items)
    }
}
