use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{DynamicObject, Patch, PatchParams},
    Api, Client,
};
use kubevirt_provider_core::{
    kubernetes::operations::apply_resource,
    resources::machine::{machine_class_resource, MachineClassValues, MACHINE_CLASS_CHART_PATH},
};
use log::info;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart '{}' is not supported!", .0)]
    UnsupportedChart(String),
    #[error("Chart values are invalid! Reason: {}", .0)]
    InvalidValues(serde_json::Error),
    #[error("Couldn't apply '{}'! Reason: {}", .0, .1)]
    KubeApiError(String, kube::Error),
}

/// Renders a chart with the given values and applies the result to the seed.
#[async_trait]
pub trait ChartApplier: Send + Sync {
    async fn apply(
        &self,
        chart_path: &str,
        namespace: &str,
        release_name: &str,
        values: &Value,
    ) -> Result<(), ChartError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MachineClassChartValues {
    #[serde(default)]
    machine_classes: Vec<MachineClassValues>,
}

/// Applies the machine-class chart by rendering every entry of its
/// `machineClasses` value into a MachineClass and its credentials secret.
pub struct MachineClassChartApplier {
    client: Client,
    field_manager: String,
}

impl MachineClassChartApplier {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl ChartApplier for MachineClassChartApplier {
    async fn apply(
        &self,
        chart_path: &str,
        namespace: &str,
        release_name: &str,
        values: &Value,
    ) -> Result<(), ChartError> {
        if chart_path != MACHINE_CLASS_CHART_PATH {
            return Err(ChartError::UnsupportedChart(chart_path.to_owned()));
        }

        let values = MachineClassChartValues::deserialize(values).map_err(ChartError::InvalidValues)?;
        let patch_params = PatchParams::apply(&self.field_manager).force();
        let classes: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &machine_class_resource());

        info!(
            "Applying {} machine classes of release '{release_name}' in '{namespace}'...",
            values.machine_classes.len()
        );

        for class_values in &values.machine_classes {
            let (secret, class) = class_values.render(namespace);

            apply_resource::<Secret>(&self.client, &secret, &patch_params)
                .await
                .map_err(|err| ChartError::KubeApiError(format!("secret {}", class_values.name), err))?;

            classes
                .patch(&class_values.name, &patch_params, &Patch::Apply(&class))
                .await
                .map_err(|err| {
                    ChartError::KubeApiError(format!("machine class {}", class_values.name), err)
                })?;
        }

        Ok(())
    }
}
