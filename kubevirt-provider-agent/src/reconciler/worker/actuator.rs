use std::{collections::BTreeSet, sync::Arc};

use async_trait::async_trait;
use kubevirt_provider_core::{
    helpers::RequireMetadata,
    kubernetes::data_volume::DataVolumeManager,
    resources::{
        crd::extensions::{cluster::ClusterContext, worker::Worker},
        labels::get_cluster_labels,
    },
};
use log::info;

use crate::{reconciler::error::ActuatorError, seed::SeedClient};

use super::WorkerActuator;

/// Wraps a worker actuator and, once it succeeded, deletes the pre-allocated
/// data volumes whose machine class no longer exists.
pub struct KubeVirtWorkerActuator {
    inner: Arc<dyn WorkerActuator>,
    seed: Arc<dyn SeedClient>,
    data_volumes: Arc<dyn DataVolumeManager>,
}

impl KubeVirtWorkerActuator {
    pub fn new(
        inner: Arc<dyn WorkerActuator>,
        seed: Arc<dyn SeedClient>,
        data_volumes: Arc<dyn DataVolumeManager>,
    ) -> Self {
        Self {
            inner,
            seed,
            data_volumes,
        }
    }

    async fn delete_orphaned_data_volumes(&self, worker: &Worker) -> Result<(), ActuatorError> {
        let namespace = worker.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
        let reference = &worker.spec.secret_ref;

        let kubeconfig = self.seed.get_kubeconfig(reference).await.map_err(|err| {
            ActuatorError::Kubeconfig(
                format!(
                    "{}/{}",
                    reference.namespace.as_deref().unwrap_or_default(),
                    reference.name.as_deref().unwrap_or_default()
                ),
                err,
            )
        })?;

        let classes: BTreeSet<String> = self
            .seed
            .list_machine_class_names(namespace)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(
                    format!("list machine classes in '{namespace}'").into(),
                    err,
                )
            })?
            .into_iter()
            .collect();

        let volumes = self
            .data_volumes
            .list_data_volumes(&kubeconfig, &get_cluster_labels(namespace))
            .await
            .map_err(|err| ActuatorError::Manager("list data volumes".into(), err))?;

        for volume in volumes {
            let Some(name) = volume.metadata.name else {
                continue;
            };

            if classes.contains(&name) {
                continue;
            }

            info!("Data volume '{name}' of '{namespace}' has no machine class anymore");
            self.data_volumes
                .delete_data_volume(&kubeconfig, &name)
                .await
                .map_err(|err| {
                    ActuatorError::Manager(format!("delete orphaned data volume '{name}'").into(), err)
                })?;
        }

        Ok(())
    }
}

#[async_trait]
impl WorkerActuator for KubeVirtWorkerActuator {
    async fn reconcile(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        self.inner
            .reconcile(worker, cluster)
            .await
            .map_err(|err| ActuatorError::WorkerReconcile(Box::new(err)))?;

        self.delete_orphaned_data_volumes(worker)
            .await
            .map_err(|err| ActuatorError::WorkerReconcile(Box::new(err)))
    }

    async fn delete(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        self.inner
            .delete(worker, cluster)
            .await
            .map_err(|err| ActuatorError::WorkerDelete(Box::new(err)))?;

        self.delete_orphaned_data_volumes(worker)
            .await
            .map_err(|err| ActuatorError::WorkerDelete(Box::new(err)))
    }

    async fn restore(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        self.inner.restore(worker, cluster).await
    }

    async fn migrate(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        self.inner.migrate(worker, cluster).await
    }
}
