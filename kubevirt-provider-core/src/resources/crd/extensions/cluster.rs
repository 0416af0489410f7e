use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::apis::gardener::{CloudProfile, Shoot};

/// Carries the CloudProfile, Seed and Shoot a set of extension resources belongs to.
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "extensions.gardener.cloud",
    version = "v1alpha1",
    kind = "Cluster",
    derive = "Default"
)]
pub struct ClusterSpec {
    pub cloud_profile: Value,
    pub seed: Value,
    pub shoot: Value,
}

#[derive(Debug, Error)]
pub enum ClusterDecodeError {
    #[error("Couldn't decode the cloud profile of the cluster! Reason: {}", .0)]
    CloudProfile(serde_json::Error),
    #[error("Couldn't decode the shoot of the cluster! Reason: {}", .0)]
    Shoot(serde_json::Error),
}

/// Decoded view of a [`Cluster`] resource.
#[derive(Clone, Debug, Default)]
pub struct ClusterContext {
    pub cloud_profile: CloudProfile,
    pub shoot: Shoot,
}

impl TryFrom<&Cluster> for ClusterContext {
    type Error = ClusterDecodeError;

    fn try_from(cluster: &Cluster) -> Result<Self, Self::Error> {
        Ok(Self {
            cloud_profile: serde_json::from_value(cluster.spec.cloud_profile.clone())
                .map_err(ClusterDecodeError::CloudProfile)?,
            shoot: serde_json::from_value(cluster.spec.shoot.clone())
                .map_err(ClusterDecodeError::Shoot)?,
        })
    }
}
