use std::fmt::Debug;

use k8s_openapi::{
    api::core::v1::{Secret, SecretReference},
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::{
    api::{Patch, PatchParams},
    core::ObjectMeta,
    Api, Client, Resource,
};
use log::info;
use thiserror::Error;

use crate::helpers::pretty_type_name;

use super::KUBECONFIG_SECRET_KEY;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret reference is missing its {}!", .0)]
    IncompleteReference(&'static str),
    #[error("Couldn't get secret by reference! Reason: {}", .0)]
    KubeApiError(kube::Error),
    #[error("Missing '{}' field in secret!", .0)]
    MissingKey(&'static str),
}

pub async fn get_secret_by_reference(
    client: &Client,
    reference: &SecretReference,
) -> Result<Secret, SecretError> {
    let name = reference
        .name
        .as_deref()
        .ok_or(SecretError::IncompleteReference("name"))?;
    let namespace = reference
        .namespace
        .as_deref()
        .ok_or(SecretError::IncompleteReference("namespace"))?;

    Api::<Secret>::namespaced(client.clone(), namespace)
        .get(name)
        .await
        .map_err(SecretError::KubeApiError)
}

/// Extracts the provider cluster kubeconfig from the cloud provider secret.
pub fn kubeconfig_from_secret(secret: &Secret) -> Result<Vec<u8>, SecretError> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
        .map(|kubeconfig| kubeconfig.0.clone())
        .ok_or(SecretError::MissingKey(KUBECONFIG_SECRET_KEY))
}

/// Server side applies a namespaced resource.
pub async fn apply_resource<T>(
    client: &Client,
    resource: &T,
    patch_params: &PatchParams,
) -> Result<T, kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Serialize
        + Clone
        + DeserializeOwned
        + Debug,
{
    let (name, namespace) = name_and_namespace(resource.meta());

    info!(
        "Applying '{name}' {} resource in '{namespace}'...",
        pretty_type_name::<T>()
    );

    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    api.patch(name, patch_params, &Patch::Apply(resource)).await
}

fn name_and_namespace(meta: &ObjectMeta) -> (&str, &str) {
    (
        meta.name.as_deref().unwrap_or_default(),
        meta.namespace.as_deref().unwrap_or_default(),
    )
}
