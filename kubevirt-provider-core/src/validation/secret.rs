use k8s_openapi::api::core::v1::Secret;
use kube::config::{Kubeconfig, KubeconfigError};
use thiserror::Error;

use crate::kubernetes::{
    operations::{kubeconfig_from_secret, SecretError},
    KUBECONFIG_SECRET_KEY,
};

#[derive(Debug, Error)]
pub enum SecretValidationError {
    #[error("{}", .0)]
    Secret(SecretError),
    #[error("Field '{}' of the secret is not a valid kubeconfig! Reason: {}", KUBECONFIG_SECRET_KEY, .0)]
    InvalidKubeconfig(KubeconfigError),
    #[error("Kubeconfig has no usable current context!")]
    MissingContext,
    #[error("Kubeconfig context '{}' references unknown cluster '{}'!", .0, .1)]
    UnknownCluster(String, String),
}

/// Checks that the cloud provider secret carries a kubeconfig a client can be built from.
pub fn validate_cloud_provider_secret(secret: &Secret) -> Result<(), SecretValidationError> {
    let kubeconfig = kubeconfig_from_secret(secret).map_err(SecretValidationError::Secret)?;
    let kubeconfig = Kubeconfig::from_yaml(&String::from_utf8_lossy(&kubeconfig))
        .map_err(SecretValidationError::InvalidKubeconfig)?;

    let current_context = kubeconfig
        .current_context
        .as_deref()
        .ok_or(SecretValidationError::MissingContext)?;
    let context = kubeconfig
        .contexts
        .iter()
        .find(|context| context.name == current_context)
        .and_then(|context| context.context.as_ref())
        .ok_or(SecretValidationError::MissingContext)?;

    let cluster_exists = kubeconfig
        .clusters
        .iter()
        .any(|cluster| cluster.name == context.cluster && cluster.cluster.is_some());

    if !cluster_exists {
        return Err(SecretValidationError::UnknownCluster(
            current_context.to_owned(),
            context.cluster.clone(),
        ));
    }

    Ok(())
}
