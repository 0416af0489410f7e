use crate::apis::{
    codec::ProviderCodec,
    controlplane::ControlPlaneConfig,
    gardener::Shoot,
    infrastructure::InfrastructureConfig,
    worker::WorkerConfig,
};

use super::{
    controlplane::validate_control_plane_config,
    field::{ErrorList, FieldError, Path},
    infrastructure::validate_infrastructure_config,
    worker::validate_worker_config,
};

/// Validates every provider specific configuration embedded in a shoot.
pub fn validate_shoot(shoot: &Shoot, codec: &ProviderCodec) -> ErrorList {
    let mut errors = ErrorList::new();
    let provider_path = Path::new("spec").child("provider");
    let provider = &shoot.spec.provider;

    let infrastructure_config_path = provider_path.child("infrastructureConfig");
    match &provider.infrastructure_config {
        Some(raw) => match codec.decode::<InfrastructureConfig>(raw) {
            Ok(config) => errors.extend(validate_infrastructure_config(&config, &infrastructure_config_path)),
            Err(err) => errors.push(FieldError::invalid(&infrastructure_config_path, raw, err.to_string())),
        },
        None => errors.push(FieldError::required(
            &infrastructure_config_path,
            "InfrastructureConfig must be set for KubeVirt shoots",
        )),
    }

    if let Some(raw) = &provider.control_plane_config {
        let control_plane_config_path = provider_path.child("controlPlaneConfig");

        match codec.decode::<ControlPlaneConfig>(raw) {
            Ok(config) => errors.extend(validate_control_plane_config(&config, &control_plane_config_path)),
            Err(err) => errors.push(FieldError::invalid(&control_plane_config_path, raw, err.to_string())),
        }
    }

    for (i, worker) in provider.workers.iter().enumerate() {
        let worker_path = provider_path.child("workers").index(i);

        if worker.zones.is_empty() {
            errors.push(FieldError::required(&worker_path.child("zones"), "at least one zone must be configured"));
        }

        let Some(raw) = &worker.provider_config else {
            continue;
        };

        let config_path = worker_path.child("providerConfig");
        let data_volumes: Vec<String> = worker.data_volumes.iter().map(|volume| volume.name.clone()).collect();

        match codec.decode::<WorkerConfig>(raw) {
            Ok(config) => errors.extend(validate_worker_config(&config, &data_volumes, &config_path)),
            Err(err) => errors.push(FieldError::invalid(&config_path, raw, err.to_string())),
        }
    }

    errors
}
