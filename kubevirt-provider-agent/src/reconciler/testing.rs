//! In-memory stand-ins for the seed and provider clusters.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use data_encoding::BASE64;
use k8s_openapi::{
    api::core::v1::{Secret, SecretReference},
    apimachinery::pkg::{api::resource::Quantity, util::intstr::IntOrString},
    ByteString,
};
use kube::{api::DynamicObject, core::ObjectMeta};
use kubevirt_provider_core::{
    apis::{
        cloudprofile::{CloudProfileConfig, MachineImageVersion, MachineImages},
        codec::ProviderCodec,
        gardener::{CloudProfileMachineType, MachineTypeStorage, VolumeType},
    },
    kubernetes::{
        client_cache::NamespaceResolver,
        data_volume::DataVolumeManager,
        network::NetworkManager,
        operations::{kubeconfig_from_secret, SecretError},
        ManagerError, KUBECONFIG_SECRET_KEY,
    },
    resources::crd::{
        extensions::{
            cluster::{Cluster, ClusterContext},
            worker::{
                MachineDeploymentStatus, MachineImageReference, Worker, WorkerPool, WorkerSpec,
            },
        },
        kubevirt::{
            data_volume::{DataVolume, DataVolumeSpec},
            network_attachment::{NetworkAttachmentDefinition, NetworkAttachmentDefinitionSpec},
        },
    },
};
use serde_json::Value;

use crate::{
    chart::{ChartApplier, ChartError},
    seed::SeedClient,
};

pub const PROVIDER_NAMESPACE: &str = "kubevirt-tenant";
pub const KUBECONFIG: &[u8] = b"apiVersion: v1\nkind: Config\n";
pub const SHOOT_NAMESPACE: &str = "shoot--dev--a";
pub const UBUNTU_IMAGE_URL: &str = "https://images/ubuntu-20.04.img";

pub fn secret_ref() -> SecretReference {
    SecretReference {
        name: Some("cloudprovider".to_owned()),
        namespace: Some("shoot--dev--a".to_owned()),
    }
}

fn has_labels(meta: &ObjectMeta, labels: &BTreeMap<String, String>) -> bool {
    let own = meta.labels.clone().unwrap_or_default();

    labels.iter().all(|(key, value)| own.get(key) == Some(value))
}

pub struct FakeSeedClient {
    pub kubeconfig: Option<Vec<u8>>,
    pub secret_reads: AtomicU32,
    pub clusters: Mutex<BTreeMap<String, Cluster>>,
    pub infrastructure_statuses: Mutex<Vec<Value>>,
    pub worker_provider_statuses: Mutex<Vec<Value>>,
    pub worker_machine_deployments: Mutex<Vec<Vec<MachineDeploymentStatus>>>,
    pub machine_classes: Mutex<BTreeSet<String>>,
    pub machine_deployments: Mutex<BTreeMap<String, DynamicObject>>,
}

impl Default for FakeSeedClient {
    fn default() -> Self {
        Self {
            kubeconfig: Some(KUBECONFIG.to_vec()),
            secret_reads: AtomicU32::new(0),
            clusters: Default::default(),
            infrastructure_statuses: Default::default(),
            worker_provider_statuses: Default::default(),
            worker_machine_deployments: Default::default(),
            machine_classes: Default::default(),
            machine_deployments: Default::default(),
        }
    }
}

impl FakeSeedClient {
    pub fn with_machine_classes(names: &[&str]) -> Self {
        Self {
            machine_classes: Mutex::new(names.iter().map(|name| name.to_string()).collect()),
            ..Default::default()
        }
    }

    pub fn last_infrastructure_status(&self) -> Option<Value> {
        self.infrastructure_statuses.lock().unwrap().last().cloned()
    }

    pub fn last_worker_provider_status(&self) -> Option<Value> {
        self.worker_provider_statuses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SeedClient for FakeSeedClient {
    async fn get_secret(&self, _reference: &SecretReference) -> Result<Secret, SecretError> {
        self.secret_reads.fetch_add(1, Ordering::SeqCst);

        Ok(Secret {
            data: self.kubeconfig.as_ref().map(|kubeconfig| {
                BTreeMap::from([(
                    KUBECONFIG_SECRET_KEY.to_owned(),
                    ByteString(kubeconfig.clone()),
                )])
            }),
            ..Default::default()
        })
    }

    async fn get_kubeconfig(&self, reference: &SecretReference) -> Result<Vec<u8>, SecretError> {
        kubeconfig_from_secret(&self.get_secret(reference).await?)
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, kube::Error> {
        self.clusters
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn update_infrastructure_provider_status(
        &self,
        _namespace: &str,
        _name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error> {
        self.infrastructure_statuses.lock().unwrap().push(provider_status);
        Ok(())
    }

    async fn update_worker_provider_status(
        &self,
        _namespace: &str,
        _name: &str,
        provider_status: Value,
    ) -> Result<(), kube::Error> {
        self.worker_provider_statuses.lock().unwrap().push(provider_status);
        Ok(())
    }

    async fn update_worker_machine_deployments(
        &self,
        _namespace: &str,
        _name: &str,
        machine_deployments: Vec<MachineDeploymentStatus>,
    ) -> Result<(), kube::Error> {
        self.worker_machine_deployments
            .lock()
            .unwrap()
            .push(machine_deployments);
        Ok(())
    }

    async fn list_machine_class_names(&self, _namespace: &str) -> Result<Vec<String>, kube::Error> {
        Ok(self.machine_classes.lock().unwrap().iter().cloned().collect())
    }

    async fn list_machine_deployments(
        &self,
        _namespace: &str,
    ) -> Result<Vec<DynamicObject>, kube::Error> {
        Ok(self
            .machine_deployments
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect())
    }

    async fn apply_machine_deployment(&self, deployment: &DynamicObject) -> Result<(), kube::Error> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        self.machine_deployments
            .lock()
            .unwrap()
            .insert(name, deployment.clone());
        Ok(())
    }

    async fn delete_machine_deployment(
        &self,
        _namespace: &str,
        name: &str,
    ) -> Result<(), kube::Error> {
        self.machine_deployments.lock().unwrap().remove(name);
        Ok(())
    }

    async fn delete_machine_class(&self, _namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.machine_classes.lock().unwrap().remove(name);
        Ok(())
    }
}

fn not_found() -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_owned(),
        message: "not found".to_owned(),
        reason: "NotFound".to_owned(),
        code: 404,
    })
}

/// Network attachment definitions keyed by `(namespace, name)`.
#[derive(Default)]
pub struct FakeNetworkManager {
    pub definitions: Mutex<BTreeMap<(String, String), NetworkAttachmentDefinition>>,
    pub writes: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeNetworkManager {
    pub fn with_shared(namespace: &str, name: &str, config: &str) -> Self {
        let manager = Self::default();
        manager.definitions.lock().unwrap().insert(
            (namespace.to_owned(), name.to_owned()),
            definition(namespace, name, BTreeMap::new(), config),
        );
        manager
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions
            .lock()
            .unwrap()
            .keys()
            .map(|(namespace, name)| format!("{namespace}/{name}"))
            .collect()
    }
}

fn definition(
    namespace: &str,
    name: &str,
    labels: BTreeMap<String, String>,
    config: &str,
) -> NetworkAttachmentDefinition {
    NetworkAttachmentDefinition {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(namespace.to_owned()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: NetworkAttachmentDefinitionSpec {
            config: config.to_owned(),
        },
    }
}

#[async_trait]
impl NetworkManager for FakeNetworkManager {
    async fn create_or_update_network_attachment_definition(
        &self,
        _kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        config: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError> {
        let desired = definition(PROVIDER_NAMESPACE, name, labels.clone(), config);
        let mut definitions = self.definitions.lock().unwrap();
        let key = (PROVIDER_NAMESPACE.to_owned(), name.to_owned());

        if definitions.get(&key) != Some(&desired) {
            self.writes.lock().unwrap().push(name.to_owned());
            definitions.insert(key, desired.clone());
        }

        Ok(desired)
    }

    async fn delete_network_attachment_definition(
        &self,
        _kubeconfig: &[u8],
        name: &str,
    ) -> Result<(), ManagerError> {
        self.deletes.lock().unwrap().push(name.to_owned());
        self.definitions
            .lock()
            .unwrap()
            .remove(&(PROVIDER_NAMESPACE.to_owned(), name.to_owned()));
        Ok(())
    }

    async fn get_network_attachment_definition(
        &self,
        _kubeconfig: &[u8],
        name: &str,
        namespace: &str,
    ) -> Result<NetworkAttachmentDefinition, ManagerError> {
        let namespace = if namespace.is_empty() {
            PROVIDER_NAMESPACE
        } else {
            namespace
        };

        self.definitions
            .lock()
            .unwrap()
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
            .ok_or_else(|| {
                ManagerError::NotFound("NetworkAttachmentDefinition", format!("{namespace}/{name}"))
            })
    }

    async fn list_network_attachment_definitions(
        &self,
        _kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<NetworkAttachmentDefinition>, ManagerError> {
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .filter(|((namespace, _), definition)| {
                namespace == PROVIDER_NAMESPACE && has_labels(&definition.metadata, labels)
            })
            .map(|(_, definition)| definition.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct FakeDataVolumeManager {
    pub volumes: Mutex<BTreeMap<String, DataVolume>>,
    pub deletes: Mutex<Vec<String>>,
}

impl FakeDataVolumeManager {
    pub fn with_volumes(names: &[&str], labels: &BTreeMap<String, String>) -> Self {
        let manager = Self::default();
        for name in names {
            manager
                .volumes
                .lock()
                .unwrap()
                .insert(name.to_string(), volume(name, labels.clone(), DataVolumeSpec::default()));
        }
        manager
    }

    pub fn names(&self) -> Vec<String> {
        self.volumes.lock().unwrap().keys().cloned().collect()
    }
}

fn volume(name: &str, labels: BTreeMap<String, String>, spec: DataVolumeSpec) -> DataVolume {
    DataVolume {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(PROVIDER_NAMESPACE.to_owned()),
            labels: Some(labels),
            ..Default::default()
        },
        spec,
    }
}

#[async_trait]
impl DataVolumeManager for FakeDataVolumeManager {
    async fn create_or_update_data_volume(
        &self,
        _kubeconfig: &[u8],
        name: &str,
        labels: &BTreeMap<String, String>,
        spec: &DataVolumeSpec,
    ) -> Result<DataVolume, ManagerError> {
        let volume = volume(name, labels.clone(), spec.clone());
        self.volumes
            .lock()
            .unwrap()
            .insert(name.to_owned(), volume.clone());
        Ok(volume)
    }

    async fn delete_data_volume(&self, _kubeconfig: &[u8], name: &str) -> Result<(), ManagerError> {
        self.deletes.lock().unwrap().push(name.to_owned());
        self.volumes.lock().unwrap().remove(name);
        Ok(())
    }

    async fn get_data_volume(
        &self,
        _kubeconfig: &[u8],
        name: &str,
    ) -> Result<Option<DataVolume>, ManagerError> {
        Ok(self.volumes.lock().unwrap().get(name).cloned())
    }

    async fn list_data_volumes(
        &self,
        _kubeconfig: &[u8],
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<DataVolume>, ManagerError> {
        Ok(self
            .volumes
            .lock()
            .unwrap()
            .values()
            .filter(|volume| has_labels(&volume.metadata, labels))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeChartApplier {
    pub applied: Mutex<Vec<(String, String, String, Value)>>,
}

#[async_trait]
impl ChartApplier for FakeChartApplier {
    async fn apply(
        &self,
        chart_path: &str,
        namespace: &str,
        release_name: &str,
        values: &Value,
    ) -> Result<(), ChartError> {
        self.applied.lock().unwrap().push((
            chart_path.to_owned(),
            namespace.to_owned(),
            release_name.to_owned(),
            values.clone(),
        ));
        Ok(())
    }
}

pub struct FakeNamespaceResolver;

#[async_trait]
impl NamespaceResolver for FakeNamespaceResolver {
    async fn default_namespace(&self, _kubeconfig: &[u8]) -> Result<String, ManagerError> {
        Ok(PROVIDER_NAMESPACE.to_owned())
    }
}

/// A cluster whose cloud profile offers the `local-2` machine type, the
/// `default` volume type and an ubuntu 20.04 image.
pub fn cluster() -> ClusterContext {
    let codec = ProviderCodec::default();
    let mut cluster = ClusterContext::default();

    cluster.shoot.spec.kubernetes.version = "1.21.3".to_owned();
    cluster.cloud_profile.spec.machine_types = vec![CloudProfileMachineType {
        name: "local-2".to_owned(),
        cpu: Quantity("2".to_owned()),
        memory: Quantity("4Gi".to_owned()),
        gpu: None,
        storage: Some(MachineTypeStorage {
            class: "standard".to_owned(),
            storage_size: Quantity("20Gi".to_owned()),
            storage_type: None,
        }),
        usable: Some(true),
    }];
    cluster.cloud_profile.spec.volume_types = vec![VolumeType {
        name: "default".to_owned(),
        class: "standard".to_owned(),
        usable: Some(true),
    }];
    cluster.cloud_profile.spec.provider_config = codec
        .encode(&CloudProfileConfig {
            machine_images: vec![MachineImages {
                name: "ubuntu".to_owned(),
                versions: vec![MachineImageVersion {
                    version: "20.04".to_owned(),
                    source_url: UBUNTU_IMAGE_URL.to_owned(),
                }],
            }],
            machine_types: vec![],
        })
        .ok();

    cluster
}

pub fn pool(name: &str, zones: &[&str]) -> WorkerPool {
    WorkerPool {
        name: name.to_owned(),
        machine_type: "local-2".to_owned(),
        machine_image: MachineImageReference {
            name: "ubuntu".to_owned(),
            version: "20.04".to_owned(),
        },
        minimum: 1,
        maximum: 3,
        max_surge: IntOrString::Int(1),
        max_unavailable: IntOrString::Int(0),
        user_data: BASE64.encode(b"#cloud-config"),
        zones: zones.iter().map(|zone| zone.to_string()).collect(),
        ..Default::default()
    }
}

pub fn worker(pools: Vec<WorkerPool>) -> Worker {
    Worker {
        metadata: ObjectMeta {
            name: Some("worker".to_owned()),
            namespace: Some(SHOOT_NAMESPACE.to_owned()),
            ..Default::default()
        },
        spec: WorkerSpec {
            extension_type: "kubevirt".to_owned(),
            region: "local".to_owned(),
            secret_ref: secret_ref(),
            ssh_public_key: Some(BASE64.encode(b"ssh-rsa AAAA")),
            pools,
            ..Default::default()
        },
        status: None,
    }
}
