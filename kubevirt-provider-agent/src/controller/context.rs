use std::sync::Arc;

use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kubevirt_provider_core::{
    apis::codec::ProviderCodec,
    kubernetes::{
        client_cache::{ClientCache, KubeClientFactory},
        data_volume::KubeDataVolumeManager,
        network::KubeNetworkManager,
    },
    resources::crd::extensions::cluster::ClusterContext,
};
use serde::de::DeserializeOwned;

use crate::{
    chart::MachineClassChartApplier,
    config::ControllerConfig,
    reconciler::{
        error::ActuatorError,
        infrastructure::InfrastructureActuator,
        worker::{
            actuator::KubeVirtWorkerActuator, delegate::KubeVirtDelegateFactory,
            generic::GenericWorkerActuator, WorkerActuator,
        },
    },
    seed::{KubeSeedClient, SeedClient},
};

use super::ReconcileLimit;

pub struct ReconcilerContext {
    pub client: Client,
    pub config: ControllerConfig,
    pub seed: Arc<dyn SeedClient>,
    pub infrastructure: InfrastructureActuator,
    pub worker: Arc<dyn WorkerActuator>,
    pub infrastructure_limit: ReconcileLimit,
    pub worker_limit: ReconcileLimit,
}

impl ReconcilerContext {
    /// Wires the actuators against the seed cluster behind `client`.
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        let codec = ProviderCodec::default();
        let seed: Arc<dyn SeedClient> = Arc::new(KubeSeedClient::new(
            client.clone(),
            config.field_manager.clone(),
            config.backoff.clone(),
        ));
        let data_volumes = Arc::new(KubeDataVolumeManager::new(
            KubeClientFactory,
            config.backoff.clone(),
        ));

        let delegates = KubeVirtDelegateFactory::new(
            seed.clone(),
            Arc::new(MachineClassChartApplier::new(
                client.clone(),
                config.field_manager.clone(),
            )),
            Arc::new(ClientCache::new(KubeClientFactory)),
            data_volumes.clone(),
            codec.clone(),
        );
        let generic = GenericWorkerActuator::new(seed.clone(), Arc::new(delegates));

        Self {
            infrastructure: InfrastructureActuator::new(
                seed.clone(),
                Arc::new(KubeNetworkManager::new(
                    KubeClientFactory,
                    config.backoff.clone(),
                )),
                codec,
            ),
            worker: Arc::new(KubeVirtWorkerActuator::new(
                Arc::new(generic),
                seed.clone(),
                data_volumes,
            )),
            infrastructure_limit: ReconcileLimit::new(config.concurrent_reconciles),
            worker_limit: ReconcileLimit::new(config.concurrent_reconciles),
            seed,
            client,
            config,
        }
    }

    /// Api over the watched namespace, or over all namespaces when none is set.
    pub fn watched_api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = (), Scope = NamespaceResourceScope> + DeserializeOwned,
    {
        match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// The decoded Cluster resource of the shoot living in `namespace`.
    pub async fn cluster_context(&self, namespace: &str) -> Result<ClusterContext, ActuatorError> {
        let cluster = self.seed.get_cluster(namespace).await.map_err(|err| {
            ActuatorError::KubeApiError(format!("get Cluster '{namespace}'").into(), err)
        })?;

        ClusterContext::try_from(&cluster).map_err(ActuatorError::ClusterDecode)
    }
}
