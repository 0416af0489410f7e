use async_trait::async_trait;
use kubevirt_provider_core::resources::crd::extensions::{cluster::ClusterContext, worker::Worker};

use super::error::ActuatorError;

pub mod actuator;
pub mod delegate;
pub mod distribution;
pub mod error;
pub mod generic;
pub mod hash;

/// Drives the machines of a Worker resource.
#[async_trait]
pub trait WorkerActuator: Send + Sync {
    async fn reconcile(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError>;
    async fn delete(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError>;
    async fn restore(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError>;
    async fn migrate(&self, worker: &Worker, cluster: &ClusterContext) -> Result<(), ActuatorError>;
}
