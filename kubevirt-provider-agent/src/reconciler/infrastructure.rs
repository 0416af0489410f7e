use std::sync::Arc;

use kubevirt_provider_core::{
    apis::{
        codec::ProviderCodec,
        infrastructure::{InfrastructureConfig, InfrastructureStatus, NetworkStatus},
    },
    helpers::{object_name, sha256_hex, RequireMetadata},
    kubernetes::network::NetworkManager,
    resources::{
        crd::extensions::{cluster::ClusterContext, infrastructure::Infrastructure},
        labels::get_cluster_labels,
    },
};
use log::info;

use crate::seed::SeedClient;

use super::error::ActuatorError;

/// Realizes the networks of a shoot as network attachment definitions in the
/// provider cluster.
pub struct InfrastructureActuator {
    seed: Arc<dyn SeedClient>,
    networks: Arc<dyn NetworkManager>,
    codec: ProviderCodec,
}

fn tenant_network_name(namespace: &str, network: &str) -> String {
    format!("{namespace}-{network}")
}

impl InfrastructureActuator {
    pub fn new(
        seed: Arc<dyn SeedClient>,
        networks: Arc<dyn NetworkManager>,
        codec: ProviderCodec,
    ) -> Self {
        Self {
            seed,
            networks,
            codec,
        }
    }

    pub async fn reconcile(
        &self,
        infrastructure: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<InfrastructureStatus, ActuatorError> {
        let namespace = infrastructure.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
        let name = infrastructure.require_name_or(ActuatorError::MissingObjectMetadata)?;

        let config = self.infrastructure_config(infrastructure)?;
        let kubeconfig = self.kubeconfig(infrastructure).await?;
        let labels = get_cluster_labels(namespace);
        let mut networks = Vec::new();

        for tenant_network in &config.networks.tenant_networks {
            let network_name = tenant_network_name(namespace, &tenant_network.name);
            let definition = self
                .networks
                .create_or_update_network_attachment_definition(
                    &kubeconfig,
                    &network_name,
                    &labels,
                    &tenant_network.config,
                )
                .await
                .map_err(|err| {
                    ActuatorError::Manager(
                        format!("create or update tenant network '{network_name}'").into(),
                        err,
                    )
                })?;

            networks.push(NetworkStatus {
                name: object_name(&definition),
                default: tenant_network.default,
                sha: sha256_hex(&tenant_network.config),
            });
        }

        let mut status = InfrastructureStatus { networks };

        let existing = self
            .networks
            .list_network_attachment_definitions(&kubeconfig, &labels)
            .await
            .map_err(|err| ActuatorError::Manager("list tenant networks".into(), err))?;

        for definition in existing {
            if status.contains_network(&object_name(&definition)) {
                continue;
            }

            let stale_name = definition.metadata.name.as_deref().unwrap_or_default();
            info!("Tenant network '{stale_name}' is no longer configured for '{namespace}'");
            self.networks
                .delete_network_attachment_definition(&kubeconfig, stale_name)
                .await
                .map_err(|err| {
                    ActuatorError::Manager(format!("delete tenant network '{stale_name}'").into(), err)
                })?;
        }

        for shared_network in &config.networks.shared_networks {
            let definition = self
                .networks
                .get_network_attachment_definition(
                    &kubeconfig,
                    &shared_network.name,
                    &shared_network.namespace,
                )
                .await
                .map_err(|err| {
                    ActuatorError::Manager(
                        format!("get shared network '{}'", shared_network.full_name()).into(),
                        err,
                    )
                })?;

            status.networks.push(NetworkStatus {
                name: object_name(&definition),
                default: false,
                sha: sha256_hex(&definition.spec.config),
            });
        }

        let provider_status = self
            .codec
            .encode(&status)
            .map_err(|err| ActuatorError::Codec("encode InfrastructureStatus".into(), err))?;

        self.seed
            .update_infrastructure_provider_status(namespace, name, provider_status)
            .await
            .map_err(|err| {
                ActuatorError::KubeApiError(
                    format!("update status of Infrastructure '{namespace}/{name}'").into(),
                    err,
                )
            })?;

        Ok(status)
    }

    pub async fn delete(
        &self,
        infrastructure: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<(), ActuatorError> {
        let namespace = infrastructure.require_namespace_or(ActuatorError::MissingObjectMetadata)?;

        let config = self.infrastructure_config(infrastructure)?;
        let kubeconfig = self.kubeconfig(infrastructure).await?;

        for tenant_network in &config.networks.tenant_networks {
            let network_name = tenant_network_name(namespace, &tenant_network.name);
            self.networks
                .delete_network_attachment_definition(&kubeconfig, &network_name)
                .await
                .map_err(|err| {
                    ActuatorError::Manager(format!("delete tenant network '{network_name}'").into(), err)
                })?;
        }

        Ok(())
    }

    pub async fn restore(
        &self,
        _infrastructure: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<(), ActuatorError> {
        Ok(())
    }

    pub async fn migrate(
        &self,
        _infrastructure: &Infrastructure,
        _cluster: &ClusterContext,
    ) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn infrastructure_config(
        &self,
        infrastructure: &Infrastructure,
    ) -> Result<InfrastructureConfig, ActuatorError> {
        self.codec
            .decode_or_default(infrastructure.spec.provider_config.as_ref())
            .map_err(|err| {
                ActuatorError::Codec("get InfrastructureConfig from infrastructure".into(), err)
            })
    }

    async fn kubeconfig(&self, infrastructure: &Infrastructure) -> Result<Vec<u8>, ActuatorError> {
        let reference = &infrastructure.spec.secret_ref;

        self.seed.get_kubeconfig(reference).await.map_err(|err| {
            ActuatorError::Kubeconfig(
                format!(
                    "{}/{}",
                    reference.namespace.as_deref().unwrap_or_default(),
                    reference.name.as_deref().unwrap_or_default()
                ),
                err,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use kube::core::ObjectMeta;
    use kubevirt_provider_core::{
        apis::infrastructure::{
            NetworkAttachmentDefinitionReference, NetworksConfig, TenantNetwork,
        },
        kubernetes::ManagerError,
        resources::crd::extensions::infrastructure::InfrastructureSpec,
    };

    use crate::reconciler::testing::{
        secret_ref, FakeNetworkManager, FakeSeedClient, PROVIDER_NAMESPACE,
    };

    use super::*;

    const BRIDGE_CONFIG: &str = r#"{"cniVersion":"0.3.1","type":"bridge"}"#;

    fn tenant(name: &str, default: bool) -> TenantNetwork {
        TenantNetwork {
            name: name.to_owned(),
            config: BRIDGE_CONFIG.to_owned(),
            default,
        }
    }

    fn infrastructure(config: &InfrastructureConfig) -> Infrastructure {
        let codec = ProviderCodec::default();

        Infrastructure {
            metadata: ObjectMeta {
                name: Some("infrastructure".to_owned()),
                namespace: Some("shoot--dev--a".to_owned()),
                ..Default::default()
            },
            spec: InfrastructureSpec {
                extension_type: "kubevirt".to_owned(),
                provider_config: Some(codec.encode(config).unwrap()),
                region: "local".to_owned(),
                secret_ref: secret_ref(),
            },
            status: None,
        }
    }

    fn config(tenant_networks: Vec<TenantNetwork>) -> InfrastructureConfig {
        InfrastructureConfig {
            networks: NetworksConfig {
                shared_networks: vec![],
                tenant_networks,
            },
        }
    }

    fn actuator(
        seed: &Arc<FakeSeedClient>,
        networks: &Arc<FakeNetworkManager>,
    ) -> InfrastructureActuator {
        InfrastructureActuator::new(seed.clone(), networks.clone(), ProviderCodec::default())
    }

    #[tokio::test]
    async fn tenant_networks_are_created_and_reported() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::default());

        let status = actuator(&seed, &networks)
            .reconcile(
                &infrastructure(&config(vec![tenant("net1", true), tenant("net2", false)])),
                &ClusterContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            networks.names(),
            vec![
                format!("{PROVIDER_NAMESPACE}/shoot--dev--a-net1"),
                format!("{PROVIDER_NAMESPACE}/shoot--dev--a-net2"),
            ]
        );
        assert_eq!(status.networks.len(), 2);
        assert_eq!(status.networks[0].name, "kubevirt-tenant/shoot--dev--a-net1");
        assert!(status.networks[0].default);
        assert_eq!(status.networks[0].sha, sha256_hex(BRIDGE_CONFIG));

        let persisted = seed.last_infrastructure_status().unwrap();
        assert_eq!(persisted["kind"], "InfrastructureStatus");
        assert_eq!(
            ProviderCodec::default()
                .decode::<InfrastructureStatus>(&persisted)
                .unwrap(),
            status
        );
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::default());
        let actuator = actuator(&seed, &networks);
        let infrastructure = infrastructure(&config(vec![tenant("net1", true)]));

        let first = actuator
            .reconcile(&infrastructure, &ClusterContext::default())
            .await
            .unwrap();
        let second = actuator
            .reconcile(&infrastructure, &ClusterContext::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(networks.writes.lock().unwrap().len(), 1);
        assert!(networks.deletes.lock().unwrap().is_empty());
        assert_eq!(seed.infrastructure_statuses.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn removed_tenant_networks_are_deleted() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::default());
        let actuator = actuator(&seed, &networks);

        actuator
            .reconcile(
                &infrastructure(&config(vec![tenant("net1", true), tenant("net2", false)])),
                &ClusterContext::default(),
            )
            .await
            .unwrap();
        let status = actuator
            .reconcile(
                &infrastructure(&config(vec![tenant("net1", true)])),
                &ClusterContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            networks.names(),
            vec![format!("{PROVIDER_NAMESPACE}/shoot--dev--a-net1")]
        );
        assert_eq!(
            *networks.deletes.lock().unwrap(),
            vec!["shoot--dev--a-net2".to_owned()]
        );
        assert_eq!(status.networks.len(), 1);
    }

    #[tokio::test]
    async fn shared_networks_are_reported_with_their_checksum() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::with_shared("storage", "ceph", BRIDGE_CONFIG));
        let mut config = config(vec![]);
        config.networks.shared_networks = vec![NetworkAttachmentDefinitionReference {
            name: "ceph".to_owned(),
            namespace: "storage".to_owned(),
        }];

        let status = actuator(&seed, &networks)
            .reconcile(&infrastructure(&config), &ClusterContext::default())
            .await
            .unwrap();

        assert_eq!(
            status.networks,
            vec![NetworkStatus {
                name: "storage/ceph".to_owned(),
                default: false,
                sha: sha256_hex(BRIDGE_CONFIG),
            }]
        );
        assert!(networks.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_shared_network_is_an_error() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::default());
        let mut config = config(vec![]);
        config.networks.shared_networks = vec![NetworkAttachmentDefinitionReference {
            name: "ceph".to_owned(),
            namespace: String::new(),
        }];

        let result = actuator(&seed, &networks)
            .reconcile(&infrastructure(&config), &ClusterContext::default())
            .await;

        assert!(matches!(
            result,
            Err(ActuatorError::Manager(_, ManagerError::NotFound(_, name))) if name == "kubevirt-tenant/ceph"
        ));
        assert!(seed.last_infrastructure_status().is_none());
    }

    #[tokio::test]
    async fn missing_kubeconfig_is_an_error() {
        let seed = Arc::new(FakeSeedClient {
            kubeconfig: None,
            ..Default::default()
        });
        let networks = Arc::new(FakeNetworkManager::default());

        let result = actuator(&seed, &networks)
            .reconcile(
                &infrastructure(&config(vec![tenant("net1", true)])),
                &ClusterContext::default(),
            )
            .await;

        assert!(matches!(result, Err(ActuatorError::Kubeconfig(secret, _)) if secret == "shoot--dev--a/cloudprovider"));
        assert!(networks.names().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_tenant_networks() {
        let seed = Arc::new(FakeSeedClient::default());
        let networks = Arc::new(FakeNetworkManager::default());
        let actuator = actuator(&seed, &networks);
        let infrastructure = infrastructure(&config(vec![tenant("net1", true), tenant("net2", false)]));

        actuator
            .reconcile(&infrastructure, &ClusterContext::default())
            .await
            .unwrap();
        actuator
            .delete(&infrastructure, &ClusterContext::default())
            .await
            .unwrap();

        assert!(networks.names().is_empty());
    }
}
