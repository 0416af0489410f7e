//! Provider specific configuration and status objects exchanged through the
//! `providerConfig` and `providerStatus` fields of the extension resources.

pub mod cloudprofile;
pub mod codec;
pub mod controlplane;
pub mod gardener;
pub mod infrastructure;
pub mod worker;

pub const GROUP: &str = "kubevirt.provider.extensions.gardener.cloud";
pub const VERSION: &str = "v1alpha1";
pub const API_VERSION: &str = "kubevirt.provider.extensions.gardener.cloud/v1alpha1";
