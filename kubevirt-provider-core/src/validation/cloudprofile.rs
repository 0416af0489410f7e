use std::collections::{BTreeSet, HashMap};

use crate::apis::{cloudprofile::CloudProfileConfig, gardener::CloudProfileSpec};

use super::field::{ErrorList, FieldError, Path};

/// Checks that the provider config covers exactly the machine image versions
/// of the cloud profile and that every version has a source URL.
pub fn validate_cloud_profile_config(profile_spec: &CloudProfileSpec, config: &CloudProfileConfig) -> ErrorList {
    let mut errors = ErrorList::new();
    let machine_images_path = Path::new("machineImages");

    if config.machine_images.is_empty() {
        errors.push(FieldError::required(&machine_images_path, "must provide at least one machine image"));
    }

    let profile_versions: HashMap<&str, BTreeSet<&str>> = profile_spec
        .machine_images
        .iter()
        .map(|image| {
            (
                image.name.as_str(),
                image.versions.iter().map(|version| version.version.as_str()).collect(),
            )
        })
        .collect();
    let no_versions = BTreeSet::new();

    for (i, image) in config.machine_images.iter().enumerate() {
        let image_path = machine_images_path.index(i);
        let mut defined_versions = BTreeSet::new();

        if image.name.is_empty() {
            errors.push(FieldError::required(&image_path.child("name"), "must provide a name"));
        }

        let versions = match profile_versions.get(image.name.as_str()) {
            Some(versions) => versions,
            None => {
                errors.push(FieldError::forbidden(
                    &image_path.child("name"),
                    "machineImage with this name is not defined in cloud profile spec",
                ));
                &no_versions
            }
        };

        if image.versions.is_empty() {
            errors.push(FieldError::required(
                &image_path.child("versions"),
                format!("must provide at least one version for machine image {:?}", image.name),
            ));
        }

        for (j, version) in image.versions.iter().enumerate() {
            let version_path = image_path.child("versions").index(j);

            if version.version.is_empty() {
                errors.push(FieldError::required(&version_path.child("version"), "must provide a version"));
            } else {
                if !defined_versions.insert(version.version.as_str()) {
                    errors.push(FieldError::duplicate(&version_path.child("version"), &version.version));
                }

                if !versions.contains(version.version.as_str()) {
                    errors.push(FieldError::invalid(
                        &version_path.child("version"),
                        &version.version,
                        "not defined as version in cloud profile spec",
                    ));
                }
            }

            if version.source_url.is_empty() {
                errors.push(FieldError::required(&version_path.child("sourceURL"), "must provide a source URL"));
            }
        }

        let missing: Vec<&str> = versions.difference(&defined_versions).copied().collect();
        if !missing.is_empty() {
            errors.push(FieldError::invalid(&image_path, missing.join(","), "missing versions"));
        }
    }

    errors
}
