//! Structural checks of the provider configuration, consumed by admission
//! webhooks. All validators are pure and report every problem they find.

pub mod cloudprofile;
pub mod controlplane;
pub mod field;
pub mod infrastructure;
pub mod secret;
pub mod shoot;
pub mod worker;
