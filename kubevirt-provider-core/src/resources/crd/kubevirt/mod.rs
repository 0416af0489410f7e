//! Resources living in the KubeVirt provider cluster.

pub mod data_volume;
pub mod network_attachment;
