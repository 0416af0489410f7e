use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::apis::infrastructure::InfrastructureConfig;

use super::field::{ErrorList, FieldError, Path};

pub fn validate_infrastructure_config(config: &InfrastructureConfig, path: &Path) -> ErrorList {
    let mut errors = ErrorList::new();

    let networks_path = path.child("networks");
    let shared_networks_path = networks_path.child("sharedNetworks");
    let tenant_networks_path = networks_path.child("tenantNetworks");

    let mut shared_networks = HashSet::new();
    for (i, shared_network) in config.networks.shared_networks.iter().enumerate() {
        let network_path = shared_networks_path.index(i);

        if shared_network.name.is_empty() {
            errors.push(FieldError::required(&network_path.child("name"), "must provide a name"));
        }

        let full_name = shared_network.full_name();
        if !shared_networks.insert(full_name.clone()) {
            errors.push(FieldError::duplicate(&network_path, full_name));
        }
    }

    let mut tenant_networks = HashSet::new();
    let mut default_tenant_network: Option<&str> = None;
    for (i, tenant_network) in config.networks.tenant_networks.iter().enumerate() {
        let network_path = tenant_networks_path.index(i);

        if tenant_network.name.is_empty() {
            errors.push(FieldError::required(&network_path.child("name"), "must provide a name"));
        }

        if !tenant_networks.insert(tenant_network.name.as_str()) {
            errors.push(FieldError::duplicate(&network_path, &tenant_network.name));
        }

        if tenant_network.config.is_empty() {
            errors.push(FieldError::required(&network_path.child("config"), "must provide a config"));
        } else if serde_json::from_str::<Map<String, Value>>(&tenant_network.config).is_err() {
            errors.push(FieldError::invalid(
                &network_path.child("config"),
                &tenant_network.config,
                "must be a valid JSON",
            ));
        }

        if tenant_network.default {
            if default_tenant_network.is_some() {
                errors.push(FieldError::invalid(
                    &network_path.child("default"),
                    tenant_network.default,
                    "there must be at most one default tenant network",
                ));
            }
            default_tenant_network = Some(&tenant_network.name);
        }
    }

    errors
}

/// No field of the infrastructure configuration is immutable.
pub fn validate_infrastructure_config_update(
    _old_config: &InfrastructureConfig,
    _new_config: &InfrastructureConfig,
    _path: &Path,
) -> ErrorList {
    ErrorList::new()
}
