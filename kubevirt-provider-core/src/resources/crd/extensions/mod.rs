//! Gardener extension resources (`extensions.gardener.cloud/v1alpha1`) the
//! provider reconciles.

pub mod cluster;
pub mod controlplane;
pub mod infrastructure;
pub mod worker;

pub const EXTENSION_TYPE: &str = "kubevirt";
