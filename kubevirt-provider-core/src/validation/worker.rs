use std::collections::HashSet;

use crate::apis::worker::{
    Disk, WorkerConfig, DNS_POLICY_CLUSTER_FIRST, DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET,
    DNS_POLICY_DEFAULT, DNS_POLICY_NONE, ROOT_DISK_NAME,
};

use super::field::{ErrorList, FieldError, Path};

const DNS_POLICIES: [&str; 4] = [
    DNS_POLICY_CLUSTER_FIRST_WITH_HOST_NET,
    DNS_POLICY_CLUSTER_FIRST,
    DNS_POLICY_DEFAULT,
    DNS_POLICY_NONE,
];

/// Validates the worker configuration of a pool declaring `data_volumes`.
pub fn validate_worker_config(config: &WorkerConfig, data_volumes: &[String], path: &Path) -> ErrorList {
    let mut errors = ErrorList::new();

    if let Some(dns_policy) = config.dns_policy.as_deref().filter(|policy| !policy.is_empty()) {
        let dns_config_path = path.child("dnsConfig");

        if !DNS_POLICIES.contains(&dns_policy) {
            errors.push(FieldError::invalid(&path.child("dnsPolicy"), dns_policy, "invalid dns policy"));
        }

        if dns_policy == DNS_POLICY_NONE {
            let detail = format!("cannot be empty when dns policy is {DNS_POLICY_NONE}");

            match &config.dns_config {
                Some(dns_config) => {
                    if dns_config.nameservers.as_ref().map_or(true, Vec::is_empty) {
                        errors.push(FieldError::required(&dns_config_path.child("nameservers"), detail));
                    }
                }
                None => errors.push(FieldError::required(&dns_config_path, detail)),
            }
        }
    }

    if let Some(devices) = &config.devices {
        errors.extend(validate_disks(&devices.disks, data_volumes, &path.child("devices").child("disks")));
    }

    errors
}

fn validate_disks(disks: &[Disk], data_volumes: &[String], path: &Path) -> ErrorList {
    let mut errors = ErrorList::new();
    let mut names = HashSet::new();
    let mut data_disks = 0;

    for (i, disk) in disks.iter().enumerate() {
        let disk_path = path.index(i);

        if disk.name.is_empty() {
            errors.push(FieldError::required(&disk_path.child("name"), "must provide a name"));
            continue;
        }

        if !names.insert(disk.name.as_str()) {
            errors.push(FieldError::invalid(&disk_path.child("name"), &disk.name, "duplicate disk name"));
        }

        if disk.name != ROOT_DISK_NAME {
            data_disks += 1;

            if !data_volumes.contains(&disk.name) {
                errors.push(FieldError::invalid(
                    &disk_path.child("name"),
                    &disk.name,
                    "disk must match the root disk or one of the pool's data volumes",
                ));
            }
        }

        if disk.boot_order.is_some() {
            errors.push(FieldError::forbidden(
                &disk_path.child("bootOrder"),
                "boot order is managed by the machine controller",
            ));
        }
    }

    if data_disks > data_volumes.len() {
        errors.push(FieldError::invalid(
            path,
            data_disks,
            format!("the number of disks must not exceed the number of data volumes ({})", data_volumes.len()),
        ));
    }

    errors
}

/// No field of the worker configuration is immutable.
pub fn validate_worker_config_update(
    _old_config: &WorkerConfig,
    _new_config: &WorkerConfig,
    _path: &Path,
) -> ErrorList {
    ErrorList::new()
}
