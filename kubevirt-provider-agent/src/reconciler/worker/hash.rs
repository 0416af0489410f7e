use kubevirt_provider_core::{
    helpers::sha256_hex,
    resources::crd::extensions::{cluster::ClusterContext, worker::WorkerPool},
};

use super::error::DelegateError;

const HASH_LENGTH: usize = 5;

/// `major.minor` of a kubernetes version like `v1.21.3`.
pub fn version_major_minor(version: &str) -> Result<String, DelegateError> {
    let mut parts = version.trim().trim_start_matches('v').split('.');
    let invalid = || DelegateError::InvalidKubernetesVersion(version.to_owned());

    let major: u32 = parts.next().and_then(|part| part.parse().ok()).ok_or_else(invalid)?;
    let minor: u32 = parts
        .next()
        .and_then(|part| part.split(['-', '+']).next())
        .and_then(|part| part.parse().ok())
        .ok_or_else(invalid)?;

    Ok(format!("{major}.{minor}"))
}

/// Short hash of everything that requires replacing the machines of a pool
/// when it changes. `additional_data` carries provider specific inputs like
/// the realized networks.
pub fn worker_pool_hash(
    pool: &WorkerPool,
    cluster: &ClusterContext,
    additional_data: &[String],
) -> Result<String, DelegateError> {
    let kubernetes_version = pool
        .kubernetes_version
        .as_deref()
        .unwrap_or(&cluster.shoot.spec.kubernetes.version);

    let mut data = vec![
        version_major_minor(kubernetes_version)?,
        pool.machine_type.clone(),
        format!("{}{}", pool.machine_image.name, pool.machine_image.version),
    ];

    if let Some(volume) = &pool.volume {
        data.push(volume.size.clone());

        if let Some(volume_type) = &volume.volume_type {
            data.push(volume_type.clone());
        }
    }

    if let Some(provider_config) = &pool.provider_config {
        data.push(provider_config.to_string());
    }

    if let Some(cri) = pool.cri.as_ref().filter(|cri| cri.name != "docker") {
        data.push(cri.name.clone());
    }

    let digests: String = data
        .iter()
        .chain(additional_data)
        .map(sha256_hex)
        .collect();

    Ok(sha256_hex(digests)[..HASH_LENGTH].to_owned())
}

#[cfg(test)]
mod tests {
    use kubevirt_provider_core::resources::crd::extensions::worker::{
        Cri, MachineImageReference, WorkerVolume,
    };
    use serde_json::json;

    use super::*;

    fn cluster() -> ClusterContext {
        let mut cluster = ClusterContext::default();
        cluster.shoot.spec.kubernetes.version = "1.21.3".to_owned();
        cluster
    }

    fn pool() -> WorkerPool {
        WorkerPool {
            name: "pool".to_owned(),
            machine_type: "local-2".to_owned(),
            machine_image: MachineImageReference {
                name: "ubuntu".to_owned(),
                version: "18.04".to_owned(),
            },
            volume: Some(WorkerVolume {
                name: None,
                volume_type: Some("default".to_owned()),
                size: "20Gi".to_owned(),
            }),
            ..Default::default()
        }
    }

    fn hash(pool: &WorkerPool, additional_data: &[String]) -> String {
        worker_pool_hash(pool, &cluster(), additional_data).unwrap()
    }

    #[test]
    fn versions_are_reduced_to_major_minor() {
        assert_eq!(version_major_minor("1.21.3").unwrap(), "1.21");
        assert_eq!(version_major_minor("v1.22.0-beta.1").unwrap(), "1.22");
        assert_eq!(version_major_minor("1.23").unwrap(), "1.23");
        assert!(version_major_minor("latest").is_err());
        assert!(version_major_minor("1").is_err());
    }

    #[test]
    fn hash_is_deterministic_and_short() {
        let first = hash(&pool(), &[]);

        assert_eq!(first.len(), 5);
        assert_eq!(first, hash(&pool(), &[]));
    }

    #[test]
    fn patch_releases_keep_the_hash() {
        let mut patched = pool();
        patched.kubernetes_version = Some("1.21.9".to_owned());

        assert_eq!(hash(&pool(), &[]), hash(&patched, &[]));
    }

    #[test]
    fn relevant_changes_change_the_hash() {
        let baseline = hash(&pool(), &[]);

        let mut minor_upgrade = pool();
        minor_upgrade.kubernetes_version = Some("1.22.0".to_owned());
        let mut machine_type = pool();
        machine_type.machine_type = "local-4".to_owned();
        let mut image = pool();
        image.machine_image.version = "20.04".to_owned();
        let mut volume = pool();
        volume.volume = Some(WorkerVolume {
            size: "30Gi".to_owned(),
            ..volume.volume.clone().unwrap()
        });
        let mut provider_config = pool();
        provider_config.provider_config = Some(json!({ "dnsPolicy": "Default" }));
        let mut cri = pool();
        cri.cri = Some(Cri {
            name: "containerd".to_owned(),
        });

        for changed in [minor_upgrade, machine_type, image, volume, provider_config, cri] {
            assert_ne!(hash(&changed, &[]), baseline);
        }
    }

    #[test]
    fn docker_cri_is_the_default() {
        let mut docker = pool();
        docker.cri = Some(Cri {
            name: "docker".to_owned(),
        });

        assert_eq!(hash(&docker, &[]), hash(&pool(), &[]));
    }

    #[test]
    fn network_changes_change_the_hash() {
        let networks = vec![
            "kubevirt-tenant/shoot--dev--a-net1".to_owned(),
            "true".to_owned(),
            "abc".to_owned(),
        ];
        let mut changed = networks.clone();
        changed[2] = "def".to_owned();

        assert_ne!(hash(&pool(), &networks), hash(&pool(), &[]));
        assert_ne!(hash(&pool(), &networks), hash(&pool(), &changed));
    }

    #[test]
    fn missing_version_is_an_error() {
        assert!(matches!(
            worker_pool_hash(&pool(), &ClusterContext::default(), &[]),
            Err(DelegateError::InvalidKubernetesVersion(_))
        ));
    }
}
