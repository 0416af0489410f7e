use regex::Regex;

use crate::apis::controlplane::ControlPlaneConfig;

use super::field::{ErrorList, FieldError, Path};

const FEATURE_GATE_PATTERN: &str = r"^[A-Z][A-Za-z0-9]*$";

pub fn validate_control_plane_config(config: &ControlPlaneConfig, path: &Path) -> ErrorList {
    let mut errors = ErrorList::new();

    if let Some(cloud_controller_manager) = &config.cloud_controller_manager {
        let feature_gates_path = path.child("cloudControllerManager").child("featureGates");
        let Ok(pattern) = Regex::new(FEATURE_GATE_PATTERN) else {
            return errors;
        };

        for name in cloud_controller_manager.feature_gates.keys() {
            if !pattern.is_match(name) {
                errors.push(FieldError::invalid(
                    &feature_gates_path.key(name),
                    name,
                    "feature gate names must be upper camel case",
                ));
            }
        }
    }

    errors
}

/// No field of the control plane configuration is immutable.
pub fn validate_control_plane_config_update(
    _old_config: &ControlPlaneConfig,
    _new_config: &ControlPlaneConfig,
    _path: &Path,
) -> ErrorList {
    ErrorList::new()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{apis::controlplane::CloudControllerManagerConfig, validation::field::ErrorType};

    use super::*;

    #[test]
    fn malformed_feature_gates_are_invalid() {
        let config = ControlPlaneConfig {
            cloud_controller_manager: Some(CloudControllerManagerConfig {
                feature_gates: BTreeMap::from([
                    ("CustomResourceValidation".to_owned(), true),
                    ("not-a-gate".to_owned(), false),
                ]),
            }),
        };

        let errors = validate_control_plane_config(&config, &Path::default());

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].error_type, ErrorType::Invalid);
        assert_eq!(errors[0].field, "cloudControllerManager.featureGates[not-a-gate]");
    }
}
