use std::borrow::Cow;

use kubevirt_provider_core::{
    apis::codec::CodecError,
    kubernetes::{operations::SecretError, ManagerError},
    resources::crd::extensions::cluster::ClusterDecodeError,
};
use thiserror::Error;
use tokio::sync::AcquireError;

use super::worker::error::DelegateError;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Object is missing metadata!")]
    MissingObjectMetadata,
    #[error("Couldn't {}! Reason: {}", .0, .1)]
    Codec(Cow<'static, str>, CodecError),
    #[error("Couldn't get kubeconfig from secret '{}'! Reason: {}", .0, .1)]
    Kubeconfig(String, SecretError),
    #[error("Couldn't {}! Reason: {}", .0, .1)]
    Manager(Cow<'static, str>, ManagerError),
    #[error("Couldn't {}! Reason: {}", .0, .1)]
    KubeApiError(Cow<'static, str>, kube::Error),
    #[error("Couldn't read the cluster of the resource! Reason: {}", .0)]
    ClusterDecode(ClusterDecodeError),
    #[error("Pod network '{}' is not a valid CIDR! Reason: {}", .0, .1)]
    InvalidPodNetwork(String, ipnet::AddrParseError),
    #[error("{}", .0)]
    Delegate(DelegateError),
    #[error("Couldn't reconcile worker! Reason: {}", .0)]
    WorkerReconcile(Box<ActuatorError>),
    #[error("Couldn't delete worker! Reason: {}", .0)]
    WorkerDelete(Box<ActuatorError>),
    #[error("Couldn't acquire a reconcile slot! Reason: {}", .0)]
    ReconcileSlot(AcquireError),
}

impl ActuatorError {
    /// Errors that won't go away until the resource or its cluster changes.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            ActuatorError::MissingObjectMetadata
            | ActuatorError::Codec(_, _)
            | ActuatorError::ClusterDecode(_)
            | ActuatorError::InvalidPodNetwork(_, _) => true,
            ActuatorError::Delegate(error) => error.is_configuration_error(),
            ActuatorError::WorkerReconcile(error) | ActuatorError::WorkerDelete(error) => {
                error.is_configuration_error()
            }
            _ => false,
        }
    }
}
