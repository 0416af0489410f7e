//! Machine controller manager resources (`machine.sapcloud.io/v1alpha1`)
//! rendered from the synthesized machine configuration.

use std::collections::BTreeMap;

use derive_builder::Builder;
use k8s_openapi::{
    api::core::v1::{PodDNSConfig, Secret, Taint},
    apimachinery::pkg::{api::resource::Quantity, util::intstr::IntOrString},
    ByteString,
};
use kube::{
    api::{ApiResource, DynamicObject},
    core::{GroupVersionKind, ObjectMeta},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use serde_with::skip_serializing_none;

use crate::apis::{
    infrastructure::NetworkStatus,
    worker::{Cpu, Devices, Memory},
};

use super::crd::{extensions::worker::MachineControllerManagerSettings, kubevirt::data_volume::DataVolumeSpec};

pub const MACHINE_GROUP: &str = "machine.sapcloud.io";
pub const MACHINE_VERSION: &str = "v1alpha1";
pub const MACHINE_CLASS_KIND: &str = "MachineClass";
pub const MACHINE_DEPLOYMENT_KIND: &str = "MachineDeployment";
pub const MACHINE_CLASS_PROVIDER: &str = "KubeVirt";

pub const MACHINE_CLASS_CHART_PATH: &str = "charts/internal/machine-class";
pub const MACHINE_CLASS_RELEASE_NAME: &str = "machine-class";

const MACHINE_DEPLOYMENT_MIN_READY_SECONDS: i32 = 500;

pub fn machine_class_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(MACHINE_GROUP, MACHINE_VERSION, MACHINE_CLASS_KIND),
        "machineclasses",
    )
}

pub fn machine_deployment_resource() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(MACHINE_GROUP, MACHINE_VERSION, MACHINE_DEPLOYMENT_KIND),
        "machinedeployments",
    )
}

/// Value bag describing one machine class, one per pool and zone.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassValues {
    pub name: String,
    pub resources: VirtualMachineResources,
    pub root_volume: DataVolumeSpec,
    pub additional_volumes: Vec<AdditionalVolume>,
    pub ssh_keys: Vec<String>,
    pub networks: Vec<NetworkStatus>,
    pub region: String,
    pub zone: String,
    pub tags: BTreeMap<String, String>,
    pub secret: MachineClassSecret,
    pub dns_policy: Option<String>,
    pub dns_config: Option<PodDNSConfig>,
    pub memory: Option<Memory>,
    pub cpu: Option<Cpu>,
    pub devices: Option<Devices>,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineResources {
    pub requests: BTreeMap<String, Quantity>,
    pub limits: Option<BTreeMap<String, Quantity>>,
    pub overcommit_guest_overhead: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalVolume {
    pub name: String,
    pub data_volume: DataVolumeSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineClassSecret {
    pub cloud_config: String,
    pub kubeconfig: String,
}

/// Desired state of one machine deployment, one per pool and zone.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(setter(into))]
pub struct MachineDeployment {
    pub name: String,
    pub class_name: String,
    pub secret_name: String,
    pub minimum: i32,
    pub maximum: i32,
    pub max_surge: IntOrString,
    pub max_unavailable: IntOrString,
    #[builder(default)]
    pub labels: BTreeMap<String, String>,
    #[builder(default)]
    pub annotations: BTreeMap<String, String>,
    #[builder(default)]
    pub taints: Vec<Taint>,
    #[builder(default)]
    pub machine_configuration: Option<MachineConfiguration>,
}

/// Machine controller settings passed through from the worker pool.
#[skip_serializing_none]
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfiguration {
    pub machine_drain_timeout: Option<String>,
    pub machine_health_timeout: Option<String>,
    pub machine_creation_timeout: Option<String>,
    pub max_evict_retries: Option<i32>,
    /// comma separated list of node conditions
    pub node_conditions: Option<String>,
}

impl From<&MachineControllerManagerSettings> for MachineConfiguration {
    fn from(settings: &MachineControllerManagerSettings) -> Self {
        Self {
            machine_drain_timeout: settings.machine_drain_timeout.clone(),
            machine_health_timeout: settings.machine_health_timeout.clone(),
            machine_creation_timeout: settings.machine_creation_timeout.clone(),
            max_evict_retries: settings.max_evict_retries,
            node_conditions: (!settings.node_conditions.is_empty())
                .then(|| settings.node_conditions.join(",")),
        }
    }
}

impl MachineClassValues {
    /// Renders the credentials secret and the machine class that references it.
    pub fn render(&self, namespace: &str) -> (Secret, DynamicObject) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(namespace.to_owned()),
                labels: Some(BTreeMap::from([(
                    "gardener.cloud/purpose".to_owned(),
                    "machineclass".to_owned(),
                )])),
                ..Default::default()
            },
            data: Some(BTreeMap::from([
                (
                    "userData".to_owned(),
                    ByteString(self.secret.cloud_config.clone().into_bytes()),
                ),
                (
                    "kubeconfig".to_owned(),
                    ByteString(self.secret.kubeconfig.clone().into_bytes()),
                ),
            ])),
            type_: Some("Opaque".to_owned()),
            ..Default::default()
        };

        let mut machine_class = DynamicObject::new(&self.name, &machine_class_resource())
            .within(namespace);
        machine_class.data = json!({
            "provider": MACHINE_CLASS_PROVIDER,
            "providerSpec": {
                "sourceURL": self.root_volume.source.http.as_ref().map(|http| http.url.clone()),
                "resources": self.resources,
                "rootVolume": self.root_volume,
                "additionalVolumes": self.additional_volumes,
                "sshKeys": self.ssh_keys,
                "networks": self.networks,
                "region": self.region,
                "zone": self.zone,
                "tags": self.tags,
                "dnsPolicy": self.dns_policy,
                "dnsConfig": self.dns_config,
                "memory": self.memory,
                "cpu": self.cpu,
                "devices": self.devices,
            },
            "secretRef": {
                "name": self.name,
                "namespace": namespace,
            },
        });

        (secret, machine_class)
    }
}

impl MachineDeployment {
    /// Renders the machine deployment, `replicas` is the currently observed
    /// replica count clamped into the deployment's bounds.
    pub fn render(&self, namespace: &str, replicas: Option<i32>) -> DynamicObject {
        let replicas = replicas
            .unwrap_or(self.minimum)
            .clamp(self.minimum, self.maximum.max(self.minimum));

        let mut template_spec = json!({
            "class": {
                "kind": MACHINE_CLASS_KIND,
                "name": self.class_name,
            },
            "nodeTemplate": {
                "metadata": {
                    "labels": self.labels,
                    "annotations": self.annotations,
                },
                "spec": {
                    "taints": self.taints,
                },
            },
        });

        if let (Some(configuration), Value::Object(fields)) =
            (&self.machine_configuration, &mut template_spec)
        {
            if let Ok(Value::Object(configuration)) = serde_json::to_value(configuration) {
                fields.extend(configuration);
            }
        }

        let mut deployment = DynamicObject::new(&self.name, &machine_deployment_resource())
            .within(namespace);
        deployment.data = json!({
            "spec": {
                "replicas": replicas,
                "minReadySeconds": MACHINE_DEPLOYMENT_MIN_READY_SECONDS,
                "strategy": {
                    "type": "RollingUpdate",
                    "rollingUpdate": {
                        "maxSurge": self.max_surge,
                        "maxUnavailable": self.max_unavailable,
                    },
                },
                "selector": {
                    "matchLabels": { "name": self.name },
                },
                "template": {
                    "metadata": {
                        "labels": { "name": self.name },
                    },
                    "spec": template_spec,
                },
            },
        });

        deployment
    }
}
