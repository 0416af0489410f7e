pub mod apis;
pub mod helpers;
pub mod kubernetes;
pub mod resources;
pub mod validation;
