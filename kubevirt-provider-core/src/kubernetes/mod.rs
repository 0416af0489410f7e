use std::borrow::Cow;

use thiserror::Error;

pub mod client_cache;
pub mod data_volume;
pub mod network;
pub mod operations;
pub mod retry;

/// Key of the cloud provider secret that holds the provider cluster kubeconfig.
pub const KUBECONFIG_SECRET_KEY: &str = "kubeconfig";

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Couldn't parse the kubeconfig! Reason: {}", .0)]
    InvalidKubeconfig(kube::config::KubeconfigError),
    #[error("Couldn't create client from kubeconfig! Reason: {}", .0)]
    ClientCreation(kube::Error),
    #[error("{} '{}' not found!", .0, .1)]
    NotFound(&'static str, String),
    #[error("Couldn't {} '{}'! Reason: {}", .0, .1, .2)]
    KubeApiError(Cow<'static, str>, String, kube::Error),
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

pub fn is_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409)
}
