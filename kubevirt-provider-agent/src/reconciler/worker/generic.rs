use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use async_trait::async_trait;
use kubevirt_provider_core::{
    helpers::RequireMetadata,
    resources::crd::extensions::{
        cluster::ClusterContext,
        worker::{MachineDeploymentStatus, Worker},
    },
};
use log::info;

use crate::{reconciler::error::ActuatorError, seed::SeedClient};

use super::{delegate::DelegateFactory, WorkerActuator};

/// Drives a worker delegate against the machine controller resources of the
/// seed: applies what the delegate generates and removes everything else.
pub struct GenericWorkerActuator {
    seed: Arc<dyn SeedClient>,
    delegates: Arc<dyn DelegateFactory>,
}

impl GenericWorkerActuator {
    pub fn new(seed: Arc<dyn SeedClient>, delegates: Arc<dyn DelegateFactory>) -> Self {
        Self { seed, delegates }
    }

    /// Currently observed replicas of every machine deployment in `namespace`.
    async fn existing_replicas(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<String, Option<i32>>, ActuatorError> {
        let deployments = self
            .seed
            .list_machine_deployments(namespace)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(
                    format!("list machine deployments in '{namespace}'").into(),
                    err,
                )
            })?;

        Ok(deployments
            .into_iter()
            .filter_map(|deployment| {
                let replicas = deployment.data["spec"]["replicas"]
                    .as_i64()
                    .and_then(|replicas| i32::try_from(replicas).ok());

                deployment.metadata.name.map(|name| (name, replicas))
            })
            .collect())
    }

    async fn delete_machine_classes_except(
        &self,
        namespace: &str,
        wanted: &BTreeSet<String>,
    ) -> Result<(), ActuatorError> {
        let classes = self
            .seed
            .list_machine_class_names(namespace)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(
                    format!("list machine classes in '{namespace}'").into(),
                    err,
                )
            })?;

        for class in classes.iter().filter(|class| !wanted.contains(*class)) {
            info!("Deleting '{class}' machine class in '{namespace}'...");
            self.seed
                .delete_machine_class(namespace, class)
                .await
                .map_err(|err| {
                    ActuatorError::KubeApiError(format!("delete machine class '{class}'").into(), err)
                })?;
        }

        Ok(())
    }

    async fn delete_machine_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), ActuatorError> {
        info!("Deleting '{name}' machine deployment in '{namespace}'...");
        self.seed
            .delete_machine_deployment(namespace, name)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(format!("delete machine deployment '{name}'").into(), err)
            })
    }
}

#[async_trait]
impl WorkerActuator for GenericWorkerActuator {
    async fn reconcile(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        let namespace = worker.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
        let name = worker.require_name_or(ActuatorError::MissingObjectMetadata)?;

        let mut delegate = self
            .delegates
            .worker_delegate(worker, cluster)
            .map_err(ActuatorError::Delegate)?;

        delegate
            .deploy_machine_classes()
            .await
            .map_err(ActuatorError::Delegate)?;
        let deployments = delegate
            .generate_machine_deployments()
            .await
            .map_err(ActuatorError::Delegate)?;

        let existing = self.existing_replicas(namespace).await?;

        for deployment in &deployments {
            let replicas = existing.get(&deployment.name).copied().flatten();
            let rendered = deployment.render(namespace, replicas);

            info!("Applying '{}' machine deployment in '{namespace}'...", deployment.name);
            self.seed
                .apply_machine_deployment(&rendered)
                .await
                .map_err(|err| {
                    ActuatorError::KubeApiError(
                        format!("apply machine deployment '{}'", deployment.name).into(),
                        err,
                    )
                })?;
        }

        let wanted_deployments: BTreeSet<&str> = deployments
            .iter()
            .map(|deployment| deployment.name.as_str())
            .collect();
        for stale in existing
            .keys()
            .filter(|name| !wanted_deployments.contains(name.as_str()))
        {
            self.delete_machine_deployment(namespace, stale).await?;
        }

        let wanted_classes: BTreeSet<String> = deployments
            .iter()
            .map(|deployment| deployment.class_name.clone())
            .collect();
        self.delete_machine_classes_except(namespace, &wanted_classes)
            .await?;

        delegate
            .update_machine_images_status()
            .await
            .map_err(ActuatorError::Delegate)?;

        let statuses: Vec<MachineDeploymentStatus> = deployments
            .iter()
            .map(|deployment| MachineDeploymentStatus {
                name: deployment.name.clone(),
                minimum: deployment.minimum,
                maximum: deployment.maximum,
            })
            .collect();
        self.seed
            .update_worker_machine_deployments(namespace, name, statuses)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(
                    format!("update machine deployments of Worker '{namespace}/{name}'").into(),
                    err,
                )
            })?;

        info!(
            "Reconciled {} {} backed machine deployments for '{namespace}/{name}'",
            deployments.len(),
            delegate.machine_class_kind()
        );

        Ok(())
    }

    async fn delete(&self, worker: &Worker, _cluster: &ClusterContext) -> Result<(), ActuatorError> {
        let namespace = worker.require_namespace_or(ActuatorError::MissingObjectMetadata)?;

        for deployment in self.existing_replicas(namespace).await?.keys() {
            self.delete_machine_deployment(namespace, deployment).await?;
        }

        self.delete_machine_classes_except(namespace, &BTreeSet::new())
            .await
    }

    async fn restore(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError> {
        self.reconcile(worker, cluster).await
    }

    async fn migrate(&self, _worker: &Worker, _cluster: &ClusterContext) -> Result<(), ActuatorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use kube::api::DynamicObject;
    use kubevirt_provider_core::{
        apis::codec::ProviderCodec, resources::machine::machine_deployment_resource,
    };
    use serde_json::json;

    use crate::reconciler::{
        testing::{
            cluster, pool, worker, FakeChartApplier, FakeDataVolumeManager,
            FakeNamespaceResolver, FakeSeedClient, SHOOT_NAMESPACE,
        },
        worker::delegate::KubeVirtDelegateFactory,
    };

    use super::*;

    fn actuator(seed: &Arc<FakeSeedClient>) -> GenericWorkerActuator {
        let delegates = KubeVirtDelegateFactory::new(
            seed.clone(),
            Arc::new(FakeChartApplier::default()),
            Arc::new(FakeNamespaceResolver),
            Arc::new(FakeDataVolumeManager::default()),
            ProviderCodec::default(),
        );

        GenericWorkerActuator::new(seed.clone(), Arc::new(delegates))
    }

    fn existing_deployment(name: &str, replicas: i32) -> DynamicObject {
        let mut deployment =
            DynamicObject::new(name, &machine_deployment_resource()).within(SHOOT_NAMESPACE);
        deployment.data = json!({ "spec": { "replicas": replicas } });
        deployment
    }

    fn deployment_names(seed: &FakeSeedClient) -> Vec<String> {
        seed.machine_deployments.lock().unwrap().keys().cloned().collect()
    }

    #[tokio::test]
    async fn reconcile_applies_deployments_and_reports_them() {
        let seed = Arc::new(FakeSeedClient::default());

        actuator(&seed)
            .reconcile(&worker(vec![pool("pool", &["zone-a", "zone-b"])]), &cluster())
            .await
            .unwrap();

        assert_eq!(
            deployment_names(&seed),
            vec!["shoot--dev--a-pool-z1", "shoot--dev--a-pool-z2"]
        );

        let reported = seed.worker_machine_deployments.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0][0].name, "shoot--dev--a-pool-z1");
        assert_eq!((reported[0][0].minimum, reported[0][0].maximum), (1, 2));
        assert!(seed.last_worker_provider_status().is_some());
    }

    #[tokio::test]
    async fn observed_replicas_are_kept() {
        let seed = Arc::new(FakeSeedClient::default());
        seed.machine_deployments.lock().unwrap().insert(
            "shoot--dev--a-pool-z1".to_owned(),
            existing_deployment("shoot--dev--a-pool-z1", 2),
        );

        actuator(&seed)
            .reconcile(&worker(vec![pool("pool", &["zone-a"])]), &cluster())
            .await
            .unwrap();

        let deployments = seed.machine_deployments.lock().unwrap();
        assert_eq!(
            deployments["shoot--dev--a-pool-z1"].data["spec"]["replicas"],
            2
        );
    }

    #[tokio::test]
    async fn stale_deployments_and_classes_are_removed() {
        let seed = Arc::new(FakeSeedClient::with_machine_classes(&["shoot--dev--a-old-z1-abcde"]));
        seed.machine_deployments.lock().unwrap().insert(
            "shoot--dev--a-old-z1".to_owned(),
            existing_deployment("shoot--dev--a-old-z1", 1),
        );

        actuator(&seed)
            .reconcile(&worker(vec![pool("pool", &["zone-a"])]), &cluster())
            .await
            .unwrap();

        assert_eq!(deployment_names(&seed), vec!["shoot--dev--a-pool-z1"]);
        assert!(seed.machine_classes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delegate_errors_abort_before_anything_is_applied() {
        let seed = Arc::new(FakeSeedClient::default());
        let mut pool = pool("pool", &["zone-a"]);
        pool.machine_type = "huge".to_owned();

        let result = actuator(&seed)
            .reconcile(&worker(vec![pool]), &cluster())
            .await;

        assert!(matches!(&result, Err(error) if error.is_configuration_error()));
        assert!(deployment_names(&seed).is_empty());
        assert!(seed.worker_machine_deployments.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_all_machine_resources() {
        let seed = Arc::new(FakeSeedClient::with_machine_classes(&["shoot--dev--a-pool-z1-abcde"]));
        seed.machine_deployments.lock().unwrap().insert(
            "shoot--dev--a-pool-z1".to_owned(),
            existing_deployment("shoot--dev--a-pool-z1", 1),
        );

        actuator(&seed)
            .delete(&worker(vec![pool("pool", &["zone-a"])]), &cluster())
            .await
            .unwrap();

        assert!(deployment_names(&seed).is_empty());
        assert!(seed.machine_classes.lock().unwrap().is_empty());
    }
}
