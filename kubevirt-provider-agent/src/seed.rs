//! Access to the seed cluster, where the extension resources of a shoot and
//! its machine controller resources live.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Secret, SecretReference};
use kube::{
    api::{DeleteParams, DynamicObject, ListParams, Patch, PatchParams, PostParams},
    Api, Client,
};
use kubevirt_provider_core::{
    kubernetes::{
        is_not_found,
        operations::{get_secret_by_reference, kubeconfig_from_secret, SecretError},
        retry::{retry_on_conflict, Backoff},
    },
    resources::{
        crd::extensions::{
            cluster::Cluster,
            infrastructure::Infrastructure,
            worker::{MachineDeploymentStatus, Worker},
        },
        machine::{machine_class_resource, machine_deployment_resource},
    },
};
use log::info;
use serde_json::Value;

#[async_trait]
pub trait SeedClient: Send + Sync {
    async fn get_secret(&self, reference: &SecretReference) -> Result<Secret, SecretError>;

    /// Reads the provider cluster kubeconfig from the cloud provider secret.
    async fn get_kubeconfig(&self, reference: &SecretReference) -> Result<Vec<u8>, SecretError> {
        let secret = self.get_secret(reference).await?;

        kubeconfig_from_secret(&secret)
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, kube::Error>;

    /// Replaces the provider status of an Infrastructure, retrying lost races.
    async fn update_infrastructure_provider_status(
        &self,
        namespace: &str,
        name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error>;

    /// Replaces the provider status of a Worker, retrying lost races.
    async fn update_worker_provider_status(
        &self,
        namespace: &str,
        name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error>;

    async fn update_worker_machine_deployments(
        &self,
        namespace: &str,
        name: &str,
        machine_deployments: Vec<MachineDeploymentStatus>,
    ) -> Result<(), kube::Error>;

    async fn list_machine_class_names(&self, namespace: &str) -> Result<Vec<String>, kube::Error>;

    async fn list_machine_deployments(&self, namespace: &str)
        -> Result<Vec<DynamicObject>, kube::Error>;

    async fn apply_machine_deployment(&self, deployment: &DynamicObject) -> Result<(), kube::Error>;

    async fn delete_machine_deployment(&self, namespace: &str, name: &str)
        -> Result<(), kube::Error>;

    /// Deletes a machine class together with its credentials secret.
    async fn delete_machine_class(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

pub struct KubeSeedClient {
    client: Client,
    field_manager: String,
    backoff: Backoff,
}

impl KubeSeedClient {
    pub fn new(client: Client, field_manager: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            backoff,
        }
    }

    fn machine_classes(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &machine_class_resource())
    }

    fn machine_deployments(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &machine_deployment_resource())
    }
}

fn ignore_not_found<T>(result: Result<T, kube::Error>) -> Result<(), kube::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(error) if is_not_found(&error) => Ok(()),
        Err(error) => Err(error),
    }
}

#[async_trait]
impl SeedClient for KubeSeedClient {
    async fn get_secret(&self, reference: &SecretReference) -> Result<Secret, SecretError> {
        get_secret_by_reference(&self.client, reference).await
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, kube::Error> {
        Api::<Cluster>::all(self.client.clone()).get(name).await
    }

    async fn update_infrastructure_provider_status(
        &self,
        namespace: &str,
        name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error> {
        let api: Api<Infrastructure> = Api::namespaced(self.client.clone(), namespace);

        retry_on_conflict(&self.backoff, || async {
            let mut latest = api.get_status(name).await?;
            latest
                .status
                .get_or_insert_with(Default::default)
                .provider_status = Some(provider_status.clone());

            let data = serde_json::to_vec(&latest).map_err(kube::Error::SerdeError)?;
            api.replace_status(name, &PostParams::default(), data).await
        })
        .await?;

        info!("Updated provider status of Infrastructure '{namespace}/{name}'");

        Ok(())
    }

    async fn update_worker_provider_status(
        &self,
        namespace: &str,
        name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error> {
        let api: Api<Worker> = Api::namespaced(self.client.clone(), namespace);

        retry_on_conflict(&self.backoff, || async {
            let mut latest = api.get_status(name).await?;
            latest
                .status
                .get_or_insert_with(Default::default)
                .provider_status = Some(provider_status.clone());

            let data = serde_json::to_vec(&latest).map_err(kube::Error::SerdeError)?;
            api.replace_status(name, &PostParams::default(), data).await
        })
        .await
        .map(|_| ())
    }

    async fn update_worker_machine_deployments(
        &self,
        namespace: &str,
        name: &str,
        machine_deployments: Vec<MachineDeploymentStatus>,
    ) -> Result<(), kube::Error> {
        let api: Api<Worker> = Api::namespaced(self.client.clone(), namespace);

        retry_on_conflict(&self.backoff, || async {
            let mut latest = api.get_status(name).await?;
            latest
                .status
                .get_or_insert_with(Default::default)
                .machine_deployments = machine_deployments.clone();

            let data = serde_json::to_vec(&latest).map_err(kube::Error::SerdeError)?;
            api.replace_status(name, &PostParams::default(), data).await
        })
        .await
        .map(|_| ())
    }

    async fn list_machine_class_names(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        let classes = self
            .machine_classes(namespace)
            .list(&ListParams::default())
            .await?;

        Ok(classes
            .items
            .into_iter()
            .filter_map(|class| class.metadata.name)
            .collect())
    }

    async fn list_machine_deployments(
        &self,
        namespace: &str,
    ) -> Result<Vec<DynamicObject>, kube::Error> {
        let deployments = self
            .machine_deployments(namespace)
            .list(&ListParams::default())
            .await?;

        Ok(deployments.items)
    }

    async fn apply_machine_deployment(&self, deployment: &DynamicObject) -> Result<(), kube::Error> {
        let name = deployment.metadata.name.as_deref().unwrap_or_default();
        let namespace = deployment.metadata.namespace.as_deref().unwrap_or_default();

        info!("Applying '{name}' MachineDeployment in '{namespace}'...");
        self.machine_deployments(namespace)
            .patch(
                name,
                &PatchParams::apply(&self.field_manager).force(),
                &Patch::Apply(deployment),
            )
            .await
            .map(|_| ())
    }

    async fn delete_machine_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        info!("Deleting '{name}' MachineDeployment in '{namespace}'...");
        ignore_not_found(
            self.machine_deployments(namespace)
                .delete(name, &DeleteParams::default())
                .await,
        )
    }

    async fn delete_machine_class(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        info!("Deleting '{name}' MachineClass in '{namespace}'...");
        ignore_not_found(
            self.machine_classes(namespace)
                .delete(name, &DeleteParams::default())
                .await,
        )?;

        ignore_not_found(
            Api::<Secret>::namespaced(self.client.clone(), namespace)
                .delete(name, &DeleteParams::default())
                .await,
        )
    }
}
