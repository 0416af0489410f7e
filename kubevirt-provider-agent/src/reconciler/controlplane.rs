//! Chart values of the control plane components the provider contributes to a
//! shoot: the cloud provider config and the cloud-controller-manager.

use std::{collections::BTreeMap, sync::Arc};

use ipnet::IpNet;
use kubevirt_provider_core::{
    apis::{codec::ProviderCodec, controlplane::ControlPlaneConfig},
    helpers::RequireMetadata,
    resources::{
        crd::extensions::{cluster::ClusterContext, controlplane::ControlPlane},
        labels::POD_MAINTENANCE_RESTART_LABEL,
    },
};
use serde_json::{json, Map, Value};

use crate::seed::SeedClient;

use super::error::ActuatorError;

pub const CLOUD_CONTROLLER_MANAGER_NAME: &str = "cloud-controller-manager";
pub const CLOUD_PROVIDER_CONFIG_NAME: &str = "cloud-provider-config";

const CLOUD_CONTROLLER_MANAGER_REPLICAS: i32 = 1;

pub struct ValuesProvider {
    seed: Arc<dyn SeedClient>,
    codec: ProviderCodec,
}

impl ValuesProvider {
    pub fn new(seed: Arc<dyn SeedClient>, codec: ProviderCodec) -> Self {
        Self { seed, codec }
    }

    /// Values of the cloud provider config chart, carrying the provider
    /// cluster kubeconfig.
    pub async fn config_chart_values(&self, control_plane: &ControlPlane) -> Result<Value, ActuatorError> {
        let reference = &control_plane.spec.secret_ref;

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

        Ok(json!({ "kubeconfig": String::from_utf8_lossy(&kubeconfig) }))
    }

    pub fn control_plane_chart_values(
        &self,
        control_plane: &ControlPlane,
        cluster: &ClusterContext,
        checksums: &BTreeMap<String, String>,
        scaled_down: bool,
    ) -> Result<Value, ActuatorError> {
        let config: ControlPlaneConfig = self
            .codec
            .decode_or_default(control_plane.spec.provider_config.as_ref())
            .map_err(|err| {
                ActuatorError::Codec("get ControlPlaneConfig from controlplane".into(), err)
            })?;
        let namespace = control_plane.require_namespace_or(ActuatorError::MissingObjectMetadata)?;

        let replicas = if scaled_down || cluster.shoot.is_hibernated() {
            0
        } else {
            CLOUD_CONTROLLER_MANAGER_REPLICAS
        };

        let checksum = |name: &str| checksums.get(name).cloned().unwrap_or_default();
        let server_secret = format!("{CLOUD_CONTROLLER_MANAGER_NAME}-server");

        let mut values = Map::new();
        values.insert("enabled".to_owned(), json!(true));
        values.insert("replicas".to_owned(), json!(replicas));
        values.insert("clusterName".to_owned(), json!(namespace));
        values.insert(
            "kubernetesVersion".to_owned(),
            json!(cluster.shoot.spec.kubernetes.version),
        );
        values.insert("podNetwork".to_owned(), json!(pod_network(cluster)?));
        values.insert(
            "podAnnotations".to_owned(),
            json!({
                format!("checksum/secret-{CLOUD_CONTROLLER_MANAGER_NAME}"): checksum(CLOUD_CONTROLLER_MANAGER_NAME),
                format!("checksum/secret-{server_secret}"): checksum(&server_secret),
                format!("checksum/secret-{CLOUD_PROVIDER_CONFIG_NAME}"): checksum(CLOUD_PROVIDER_CONFIG_NAME),
            }),
        );
        values.insert(
            "podLabels".to_owned(),
            json!({ POD_MAINTENANCE_RESTART_LABEL: "true" }),
        );

        if let Some(ccm) = &config.cloud_controller_manager {
            values.insert("featureGates".to_owned(), json!(ccm.feature_gates));
        }

        Ok(json!({ CLOUD_CONTROLLER_MANAGER_NAME: values }))
    }

    pub fn control_plane_shoot_chart_values(&self) -> Value {
        json!({ CLOUD_CONTROLLER_MANAGER_NAME: { "enabled": true } })
    }

    pub fn storage_classes_chart_values(&self) -> Value {
        json!({})
    }
}

/// The pods CIDR of the shoot, empty when none is configured.
fn pod_network(cluster: &ClusterContext) -> Result<String, ActuatorError> {
    match cluster.shoot.spec.networking.pods.as_deref() {
        Some(pods) => pods
            .parse::<IpNet>()
            .map(|network| network.to_string())
            .map_err(|err| ActuatorError::InvalidPodNetwork(pods.to_owned(), err)),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use kube::core::ObjectMeta;
    use kubevirt_provider_core::{
        apis::{
            controlplane::CloudControllerManagerConfig,
            gardener::Hibernation,
        },
        resources::crd::extensions::controlplane::ControlPlaneSpec,
    };

    use crate::reconciler::testing::{secret_ref, FakeSeedClient, KUBECONFIG, SHOOT_NAMESPACE};

    use super::*;

    fn provider(seed: FakeSeedClient) -> ValuesProvider {
        ValuesProvider::new(Arc::new(seed), ProviderCodec::default())
    }

    fn control_plane(config: Option<ControlPlaneConfig>) -> ControlPlane {
        ControlPlane {
            metadata: ObjectMeta {
                name: Some("control-plane".to_owned()),
                namespace: Some(SHOOT_NAMESPACE.to_owned()),
                ..Default::default()
            },
            spec: ControlPlaneSpec {
                extension_type: "kubevirt".to_owned(),
                provider_config: config.and_then(|config| ProviderCodec::default().encode(&config).ok()),
                region: "local".to_owned(),
                secret_ref: secret_ref(),
                infrastructure_provider_status: None,
            },
            status: None,
        }
    }

    fn cluster(pods: Option<&str>) -> ClusterContext {
        let mut cluster = ClusterContext::default();
        cluster.shoot.spec.kubernetes.version = "1.21.3".to_owned();
        cluster.shoot.spec.networking.pods = pods.map(str::to_owned);
        cluster
    }

    fn checksums() -> BTreeMap<String, String> {
        BTreeMap::from([
            (CLOUD_CONTROLLER_MANAGER_NAME.to_owned(), "3d791b16".to_owned()),
            (format!("{CLOUD_CONTROLLER_MANAGER_NAME}-server"), "6dff2a2e".to_owned()),
            (CLOUD_PROVIDER_CONFIG_NAME.to_owned(), "08a7bc7f".to_owned()),
        ])
    }

    #[tokio::test]
    async fn config_chart_carries_the_kubeconfig() {
        let values = provider(FakeSeedClient::default())
            .config_chart_values(&control_plane(None))
            .await
            .unwrap();

        assert_eq!(
            values,
            json!({ "kubeconfig": String::from_utf8_lossy(KUBECONFIG) })
        );
    }

    #[tokio::test]
    async fn config_chart_without_kubeconfig_names_the_secret() {
        let result = provider(FakeSeedClient {
            kubeconfig: None,
            ..Default::default()
        })
        .config_chart_values(&control_plane(None))
        .await;

        assert!(matches!(result, Err(ActuatorError::Kubeconfig(secret, _)) if secret == "shoot--dev--a/cloudprovider"));
    }

    #[test]
    fn control_plane_chart_configures_the_ccm() {
        let config = ControlPlaneConfig {
            cloud_controller_manager: Some(CloudControllerManagerConfig {
                feature_gates: BTreeMap::from([("CustomResourceValidation".to_owned(), true)]),
            }),
        };

        let values = provider(FakeSeedClient::default())
            .control_plane_chart_values(
                &control_plane(Some(config)),
                &cluster(Some("10.250.0.0/19")),
                &checksums(),
                false,
            )
            .unwrap();

        assert_eq!(
            values,
            json!({
                "cloud-controller-manager": {
                    "enabled": true,
                    "replicas": 1,
                    "clusterName": SHOOT_NAMESPACE,
                    "kubernetesVersion": "1.21.3",
                    "podNetwork": "10.250.0.0/19",
                    "podAnnotations": {
                        "checksum/secret-cloud-controller-manager": "3d791b16",
                        "checksum/secret-cloud-controller-manager-server": "6dff2a2e",
                        "checksum/secret-cloud-provider-config": "08a7bc7f",
                    },
                    "podLabels": { "maintenance.gardener.cloud/restart": "true" },
                    "featureGates": { "CustomResourceValidation": true },
                }
            })
        );
    }

    #[test]
    fn hibernated_or_scaled_down_shoots_run_no_ccm() {
        let provider = provider(FakeSeedClient::default());
        let mut hibernated = cluster(None);
        hibernated.shoot.spec.hibernation = Some(Hibernation { enabled: Some(true) });

        let scaled_down = provider
            .control_plane_chart_values(&control_plane(None), &cluster(None), &checksums(), true)
            .unwrap();
        let asleep = provider
            .control_plane_chart_values(&control_plane(None), &hibernated, &checksums(), false)
            .unwrap();

        assert_eq!(scaled_down[CLOUD_CONTROLLER_MANAGER_NAME]["replicas"], 0);
        assert_eq!(asleep[CLOUD_CONTROLLER_MANAGER_NAME]["replicas"], 0);
        assert_eq!(asleep[CLOUD_CONTROLLER_MANAGER_NAME]["podNetwork"], "");
        assert!(asleep[CLOUD_CONTROLLER_MANAGER_NAME].get("featureGates").is_none());
    }

    #[test]
    fn invalid_pod_network_is_an_error() {
        let result = provider(FakeSeedClient::default()).control_plane_chart_values(
            &control_plane(None),
            &cluster(Some("10.250.0.0")),
            &checksums(),
            false,
        );

        assert!(matches!(result, Err(ActuatorError::InvalidPodNetwork(pods, _)) if pods == "10.250.0.0"));
    }

    #[test]
    fn shoot_and_storage_class_values() {
        let provider = provider(FakeSeedClient::default());

        assert_eq!(
            provider.control_plane_shoot_chart_values(),
            json!({ "cloud-controller-manager": { "enabled": true } })
        );
        assert_eq!(provider.storage_classes_chart_values(), json!({}));
    }
}
