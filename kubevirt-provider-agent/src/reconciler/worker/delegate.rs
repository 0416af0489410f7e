//! Translates a Worker resource into machine classes, machine deployments
//! and the pre-allocated root volumes of the provider cluster.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kubevirt_provider_core::{
    apis::{
        cloudprofile::CloudProfileConfig,
        codec::ProviderCodec,
        gardener::CloudProfileMachineType,
        infrastructure::InfrastructureStatus,
        worker::{append_machine_image, find_machine_image, MachineImage, WorkerConfig, WorkerStatus},
    },
    helpers::{object_name, parse_quantity, RequireMetadata},
    kubernetes::{
        client_cache::NamespaceResolver, data_volume::DataVolumeManager,
    },
    resources::{
        crd::{
            extensions::{
                cluster::ClusterContext,
                worker::{Worker, WorkerPool},
            },
            kubevirt::data_volume::DataVolumeSpec,
        },
        labels::{get_cluster_labels, get_machine_class_tags},
        machine::{
            AdditionalVolume, MachineClassSecret, MachineClassValues, MachineConfiguration,
            MachineDeployment, MachineDeploymentBuilder, VirtualMachineResources,
            MACHINE_CLASS_CHART_PATH, MACHINE_CLASS_KIND, MACHINE_CLASS_RELEASE_NAME,
        },
    },
};
use log::info;
use serde_json::{json, Value};

use crate::{chart::ChartApplier, seed::SeedClient};

use super::{
    distribution::{distribute_over_zones, distribute_positive_int_or_percent},
    error::DelegateError,
    hash::worker_pool_hash,
};

/// Provider specific half of the worker actuator. One delegate serves a
/// single reconciliation of a single Worker.
#[async_trait]
pub trait WorkerDelegate: Send {
    fn machine_class_kind(&self) -> &'static str {
        MACHINE_CLASS_KIND
    }

    /// Applies the machine classes and their pre-allocated root volumes.
    async fn deploy_machine_classes(&mut self) -> Result<(), DelegateError>;

    async fn generate_machine_deployments(&mut self) -> Result<Vec<MachineDeployment>, DelegateError>;

    /// The encoded `WorkerStatus` listing every machine image in use.
    async fn machine_images(&mut self) -> Result<Value, DelegateError>;

    async fn update_machine_images_status(&mut self) -> Result<(), DelegateError>;
}

pub trait DelegateFactory: Send + Sync {
    fn worker_delegate(
        &self,
        worker: &Worker,
        cluster: &ClusterContext,
    ) -> Result<Box<dyn WorkerDelegate>, DelegateError>;
}

#[derive(Clone)]
pub struct KubeVirtDelegateFactory {
    seed: Arc<dyn SeedClient>,
    chart_applier: Arc<dyn ChartApplier>,
    namespaces: Arc<dyn NamespaceResolver>,
    data_volumes: Arc<dyn DataVolumeManager>,
    codec: ProviderCodec,
}

impl KubeVirtDelegateFactory {
    pub fn new(
        seed: Arc<dyn SeedClient>,
        chart_applier: Arc<dyn ChartApplier>,
        namespaces: Arc<dyn NamespaceResolver>,
        data_volumes: Arc<dyn DataVolumeManager>,
        codec: ProviderCodec,
    ) -> Self {
        Self {
            seed,
            chart_applier,
            namespaces,
            data_volumes,
            codec,
        }
    }
}

impl DelegateFactory for KubeVirtDelegateFactory {
    fn worker_delegate(
        &self,
        worker: &Worker,
        cluster: &ClusterContext,
    ) -> Result<Box<dyn WorkerDelegate>, DelegateError> {
        let cloud_profile_config = cluster
            .cloud_profile
            .spec
            .provider_config
            .as_ref()
            .map(|raw| self.codec.decode::<CloudProfileConfig>(raw))
            .transpose()
            .map_err(|err| {
                DelegateError::Codec("decode providerConfig of cloudProfile".into(), err)
            })?;

        Ok(Box::new(KubeVirtWorkerDelegate {
            seed: self.seed.clone(),
            chart_applier: self.chart_applier.clone(),
            namespaces: self.namespaces.clone(),
            data_volumes: self.data_volumes.clone(),
            codec: self.codec.clone(),
            worker: worker.clone(),
            cluster: cluster.clone(),
            cloud_profile_config,
            machine_config: None,
        }))
    }
}

#[derive(Debug, Clone, Default)]
struct MachineConfig {
    machine_classes: Vec<MachineClassValues>,
    machine_deployments: Vec<MachineDeployment>,
    machine_images: Vec<MachineImage>,
    /// root volumes cloned by the machines of each class
    machine_class_volumes: BTreeMap<String, DataVolumeSpec>,
}

pub struct KubeVirtWorkerDelegate {
    seed: Arc<dyn SeedClient>,
    chart_applier: Arc<dyn ChartApplier>,
    namespaces: Arc<dyn NamespaceResolver>,
    data_volumes: Arc<dyn DataVolumeManager>,
    codec: ProviderCodec,
    worker: Worker,
    cluster: ClusterContext,
    cloud_profile_config: Option<CloudProfileConfig>,
    machine_config: Option<MachineConfig>,
}

#[async_trait]
impl WorkerDelegate for KubeVirtWorkerDelegate {
    async fn deploy_machine_classes(&mut self) -> Result<(), DelegateError> {
        let (values, volumes) = {
            let config = self.machine_config().await?;

            (
                json!({ "machineClasses": config.machine_classes }),
                config.machine_class_volumes.clone(),
            )
        };
        let namespace = self.namespace()?;

        self.chart_applier
            .apply(MACHINE_CLASS_CHART_PATH, namespace, MACHINE_CLASS_RELEASE_NAME, &values)
            .await
            .map_err(DelegateError::Chart)?;

        let kubeconfig = self.kubeconfig().await?;
        let labels = get_cluster_labels(namespace);

        for (name, spec) in &volumes {
            self.data_volumes
                .create_or_update_data_volume(&kubeconfig, name, &labels, spec)
                .await
                .map_err(|err| DelegateError::DataVolume(name.clone(), err))?;
        }

        Ok(())
    }

    async fn generate_machine_deployments(&mut self) -> Result<Vec<MachineDeployment>, DelegateError> {
        Ok(self.machine_config().await?.machine_deployments.clone())
    }

    async fn machine_images(&mut self) -> Result<Value, DelegateError> {
        let status = WorkerStatus {
            machine_images: self.machine_config().await?.machine_images.clone(),
        };

        self.codec
            .encode(&status)
            .map_err(|err| DelegateError::Codec("encode WorkerStatus".into(), err))
    }

    async fn update_machine_images_status(&mut self) -> Result<(), DelegateError> {
        let provider_status = self.machine_images().await?;
        let namespace = self.namespace()?;
        let name = self
            .worker
            .require_name_or(DelegateError::MissingObjectMetadata)?;

        self.seed
            .update_worker_provider_status(namespace, name, provider_status)
            .await
            .map_err(DelegateError::StatusUpdate)
    }
}

impl KubeVirtWorkerDelegate {
    /// Generates the machine configuration on first use, later calls reuse it.
    async fn machine_config(&mut self) -> Result<&MachineConfig, DelegateError> {
        let config = match self.machine_config.take() {
            Some(config) => config,
            None => self.generate_machine_config().await?,
        };

        Ok(self.machine_config.insert(config))
    }

    fn namespace(&self) -> Result<&str, DelegateError> {
        self.worker
            .require_namespace_or(DelegateError::MissingObjectMetadata)
    }

    async fn kubeconfig(&self) -> Result<Vec<u8>, DelegateError> {
        self.seed
            .get_kubeconfig(&self.worker.spec.secret_ref)
            .await
            .map_err(DelegateError::Kubeconfig)
    }

    async fn generate_machine_config(&self) -> Result<MachineConfig, DelegateError> {
        let namespace = self.namespace()?;
        let kubeconfig = self.kubeconfig().await?;
        let provider_namespace = self
            .namespaces
            .default_namespace(&kubeconfig)
            .await
            .map_err(DelegateError::ProviderNamespace)?;

        let infrastructure_status: InfrastructureStatus = self
            .codec
            .decode_or_default(self.worker.spec.infrastructure_provider_status.as_ref())
            .map_err(|err| {
                DelegateError::Codec("get InfrastructureStatus from worker".into(), err)
            })?;
        let networks_data = infrastructure_status.network_identity();

        let ssh_public_key = self
            .worker
            .ssh_public_key()
            .map_err(|err| DelegateError::InvalidEncoding("sshPublicKey".into(), err))?;
        if ssh_public_key.is_empty() {
            return Err(DelegateError::MissingSshPublicKey);
        }
        let ssh_public_key = String::from_utf8_lossy(&ssh_public_key).into_owned();
        let kubeconfig = String::from_utf8_lossy(&kubeconfig).into_owned();

        let mut config = MachineConfig::default();

        for pool in &self.worker.spec.pools {
            let zone_count = pool.zones.len() as i32;
            let worker_config: WorkerConfig = self
                .codec
                .decode_or_default(pool.provider_config.as_ref())
                .map_err(|err| {
                    DelegateError::Codec(
                        format!("get WorkerConfig from pool '{}'", pool.name).into(),
                        err,
                    )
                })?;

            let machine_type = self.machine_type(&pool.machine_type)?;
            let pool_hash = worker_pool_hash(pool, &self.cluster, &networks_data)?;

            let image_name = &pool.machine_image.name;
            let image_version = &pool.machine_image.version;
            let image_source_url = self.machine_image_url(image_name, image_version)?;
            append_machine_image(
                &mut config.machine_images,
                MachineImage {
                    name: image_name.clone(),
                    version: image_version.clone(),
                    source_url: image_source_url.clone(),
                },
            );

            let resources = self.resources(machine_type, &worker_config);
            let (root_class, root_size) = self.root_volume(pool, machine_type)?;
            let additional_volumes = self.additional_volumes(pool)?;
            let cloud_config = pool
                .user_data()
                .map_err(|err| DelegateError::InvalidEncoding("userData".into(), err))?;
            let cloud_config = String::from_utf8_lossy(&cloud_config).into_owned();

            for (zone_index, zone) in pool.zones.iter().enumerate() {
                let zone_index = zone_index as i32;
                let deployment_name = format!("{namespace}-{}-z{}", pool.name, zone_index + 1);
                let class_name = format!("{deployment_name}-{pool_hash}");

                let root_volume = if worker_config.disable_pre_allocated_data_volumes {
                    DataVolumeSpec::with_http_source(&root_class, &root_size, &image_source_url)
                } else {
                    config.machine_class_volumes.insert(
                        class_name.clone(),
                        DataVolumeSpec::with_http_source(&root_class, &root_size, &image_source_url),
                    );
                    DataVolumeSpec::with_pvc_source(
                        &root_class,
                        &root_size,
                        &provider_namespace,
                        &class_name,
                    )
                };

                config.machine_classes.push(MachineClassValues {
                    name: class_name.clone(),
                    resources: resources.clone(),
                    root_volume,
                    additional_volumes: additional_volumes.clone(),
                    ssh_keys: vec![ssh_public_key.clone()],
                    networks: infrastructure_status.networks.clone(),
                    region: self.worker.spec.region.clone(),
                    zone: zone.clone(),
                    tags: get_machine_class_tags(namespace, &class_name),
                    secret: MachineClassSecret {
                        cloud_config: cloud_config.clone(),
                        kubeconfig: kubeconfig.clone(),
                    },
                    dns_policy: worker_config.dns_policy.clone(),
                    dns_config: worker_config.dns_config.clone(),
                    memory: worker_config.memory.clone(),
                    cpu: worker_config.cpu.clone(),
                    devices: worker_config.devices.clone(),
                });

                let deployment = MachineDeploymentBuilder::default()
                    .name(deployment_name)
                    .class_name(class_name.clone())
                    .secret_name(class_name)
                    .minimum(distribute_over_zones(zone_index, pool.minimum, zone_count))
                    .maximum(distribute_over_zones(zone_index, pool.maximum, zone_count))
                    .max_surge(distribute_positive_int_or_percent(
                        zone_index,
                        &pool.max_surge,
                        zone_count,
                        pool.maximum,
                    )?)
                    .max_unavailable(distribute_positive_int_or_percent(
                        zone_index,
                        &pool.max_unavailable,
                        zone_count,
                        pool.minimum,
                    )?)
                    .labels(pool.labels.clone())
                    .annotations(pool.annotations.clone())
                    .taints(pool.taints.clone())
                    .machine_configuration(
                        pool.machine_controller_manager
                            .as_ref()
                            .map(MachineConfiguration::from),
                    )
                    .build()
                    .map_err(DelegateError::MachineDeploymentBuilder)?;

                config.machine_deployments.push(deployment);
            }
        }

        info!(
            "Generated {} machine classes for worker '{}'",
            config.machine_classes.len(),
            object_name(&self.worker)
        );

        Ok(config)
    }

    fn machine_type(&self, name: &str) -> Result<&CloudProfileMachineType, DelegateError> {
        self.cluster
            .cloud_profile
            .spec
            .find_machine_type(name)
            .ok_or_else(|| DelegateError::MachineTypeNotFound(name.to_owned()))
    }

    /// Looks the image up in the cloud profile first and falls back to the
    /// images recorded in the worker status by previous reconciliations.
    fn machine_image_url(&self, name: &str, version: &str) -> Result<String, DelegateError> {
        if let Some(url) = self
            .cloud_profile_config
            .as_ref()
            .and_then(|config| config.find_image_source_url(name, version))
        {
            return Ok(url.to_owned());
        }

        let not_found = || DelegateError::MachineImageNotFound(name.to_owned(), version.to_owned());
        let Some(raw_status) = self
            .worker
            .status
            .as_ref()
            .and_then(|status| status.provider_status.as_ref())
        else {
            return Err(not_found());
        };

        let worker_status: WorkerStatus = self.codec.decode(raw_status).map_err(|err| {
            DelegateError::Codec(
                format!("decode worker status of worker '{}'", object_name(&self.worker)).into(),
                err,
            )
        })?;

        find_machine_image(&worker_status.machine_images, name, version)
            .map(|image| image.source_url.clone())
            .ok_or_else(not_found)
    }

    fn resources(
        &self,
        machine_type: &CloudProfileMachineType,
        worker_config: &WorkerConfig,
    ) -> VirtualMachineResources {
        let limits = self
            .cloud_profile_config
            .as_ref()
            .and_then(|config| config.find_machine_type(&machine_type.name))
            .and_then(|machine_type| machine_type.limits.as_ref())
            .map(|limits| {
                BTreeMap::from([
                    ("cpu".to_owned(), limits.cpu.clone()),
                    ("memory".to_owned(), limits.memory.clone()),
                ])
            });

        VirtualMachineResources {
            requests: BTreeMap::from([
                ("cpu".to_owned(), machine_type.cpu.clone()),
                ("memory".to_owned(), machine_type.memory.clone()),
            ]),
            limits,
            overcommit_guest_overhead: worker_config.overcommit_guest_overhead,
        }
    }

    /// Storage class and size of the root volume, from the pool's volume or
    /// the machine type's storage.
    fn root_volume(
        &self,
        pool: &WorkerPool,
        machine_type: &CloudProfileMachineType,
    ) -> Result<(String, Quantity), DelegateError> {
        if let Some(volume) = &pool.volume {
            let volume_type = volume.volume_type.as_deref().ok_or_else(|| {
                DelegateError::MissingVolumeType(
                    pool.name.clone(),
                    volume.name.clone().unwrap_or_else(|| "root".to_owned()),
                )
            })?;

            return self.storage_class_and_size(volume_type, &volume.size);
        }

        match &machine_type.storage {
            Some(storage) => Ok((storage.class.clone(), storage.storage_size.clone())),
            None => Err(DelegateError::MissingRootVolume(pool.name.clone())),
        }
    }

    fn additional_volumes(&self, pool: &WorkerPool) -> Result<Vec<AdditionalVolume>, DelegateError> {
        pool.data_volumes
            .iter()
            .map(|volume| -> Result<AdditionalVolume, DelegateError> {
                let volume_type = volume.volume_type.as_deref().ok_or_else(|| {
                    DelegateError::MissingVolumeType(pool.name.clone(), volume.name.clone())
                })?;
                let (class, size) = self.storage_class_and_size(volume_type, &volume.size)?;

                Ok(AdditionalVolume {
                    name: volume.name.clone(),
                    data_volume: DataVolumeSpec::with_blank_source(&class, &size),
                })
            })
            .collect()
    }

    fn storage_class_and_size(
        &self,
        volume_type: &str,
        size: &str,
    ) -> Result<(String, Quantity), DelegateError> {
        let volume_type = self
            .cluster
            .cloud_profile
            .spec
            .find_volume_type(volume_type)
            .ok_or_else(|| DelegateError::VolumeTypeNotFound(volume_type.to_owned()))?;
        let size = parse_quantity(size).ok_or_else(|| DelegateError::InvalidVolumeSize(size.to_owned()))?;

        Ok((volume_type.class.clone(), size))
    }
}
