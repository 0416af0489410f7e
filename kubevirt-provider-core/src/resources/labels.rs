use std::collections::BTreeMap;

use kube::api::ListParams;

/// Binds provider cluster objects to the shoot (namespace) that owns them.
pub const CLUSTER_LABEL: &str = "kubevirt.provider.extensions.gardener.cloud/cluster";

pub const MCM_CLUSTER_TAG: &str = "mcm.gardener.cloud/cluster";
pub const MCM_ROLE_TAG: &str = "mcm.gardener.cloud/role";
pub const MCM_MACHINE_CLASS_TAG: &str = "mcm.gardener.cloud/machineclass";

pub const POD_MAINTENANCE_RESTART_LABEL: &str = "maintenance.gardener.cloud/restart";

pub fn get_cluster_labels(namespace: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(CLUSTER_LABEL.to_owned(), namespace.to_owned())])
}

pub fn get_joined_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn get_listparams(labels: &BTreeMap<String, String>) -> ListParams {
    ListParams::default().labels(&get_joined_labels(labels))
}

pub fn get_machine_class_tags(namespace: &str, class_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (MCM_CLUSTER_TAG.to_owned(), namespace.to_owned()),
        (MCM_ROLE_TAG.to_owned(), "node".to_owned()),
        (MCM_MACHINE_CLASS_TAG.to_owned(), class_name.to_owned()),
    ])
}
