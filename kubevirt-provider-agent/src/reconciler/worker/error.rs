use std::borrow::Cow;

use data_encoding::DecodeError;
use kubevirt_provider_core::{
    apis::codec::CodecError,
    kubernetes::{operations::SecretError, ManagerError},
    resources::machine::MachineDeploymentBuilderError,
};
use thiserror::Error;

use crate::chart::ChartError;

#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("Worker is missing metadata!")]
    MissingObjectMetadata,
    #[error("Missing sshPublicKey in worker!")]
    MissingSshPublicKey,
    #[error("Couldn't decode the {} of the worker! Reason: {}", .0, .1)]
    InvalidEncoding(Cow<'static, str>, DecodeError),
    #[error("Machine type '{}' not found in cloud profile spec!", .0)]
    MachineTypeNotFound(String),
    #[error("Volume type '{}' not found in cloud profile spec!", .0)]
    VolumeTypeNotFound(String),
    #[error("Volume '{}' of pool '{}' has no type!", .1, .0)]
    MissingVolumeType(String, String),
    #[error("Volume size '{}' is not a valid quantity!", .0)]
    InvalidVolumeSize(String),
    #[error("Couldn't find machine image for {}/{} neither in cloud profile config nor in worker status!", .0, .1)]
    MachineImageNotFound(String, String),
    #[error("Missing root volume parameters of pool '{}'!", .0)]
    MissingRootVolume(String),
    #[error("Percentage '{}' is out of range!", .0)]
    InvalidPercentage(String),
    #[error("Kubernetes version '{}' is invalid!", .0)]
    InvalidKubernetesVersion(String),
    #[error("Couldn't {}! Reason: {}", .0, .1)]
    Codec(Cow<'static, str>, CodecError),
    #[error("Couldn't get kubeconfig of the provider cluster! Reason: {}", .0)]
    Kubeconfig(SecretError),
    #[error("Couldn't resolve the namespace of the provider cluster! Reason: {}", .0)]
    ProviderNamespace(ManagerError),
    #[error("Couldn't apply machine-class chart! Reason: {}", .0)]
    Chart(ChartError),
    #[error("Couldn't create data volume for machine class '{}'! Reason: {}", .0, .1)]
    DataVolume(String, ManagerError),
    #[error("Couldn't build machine deployment! Reason: {}", .0)]
    MachineDeploymentBuilder(MachineDeploymentBuilderError),
    #[error("Couldn't update the status of the worker! Reason: {}", .0)]
    StatusUpdate(kube::Error),
}

impl DelegateError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DelegateError::MissingObjectMetadata
                | DelegateError::MissingSshPublicKey
                | DelegateError::InvalidEncoding(_, _)
                | DelegateError::MachineTypeNotFound(_)
                | DelegateError::VolumeTypeNotFound(_)
                | DelegateError::MissingVolumeType(_, _)
                | DelegateError::InvalidVolumeSize(_)
                | DelegateError::MachineImageNotFound(_, _)
                | DelegateError::MissingRootVolume(_)
                | DelegateError::InvalidPercentage(_)
                | DelegateError::InvalidKubernetesVersion(_)
                | DelegateError::Codec(_, _)
        )
    }
}
