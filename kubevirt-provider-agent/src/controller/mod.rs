use std::sync::Arc;

use kube::{
    core::ObjectMeta,
    runtime::{controller::Action, finalizer::Error as FinalizerError},
    Client,
};
use tokio::{
    join,
    sync::{Semaphore, SemaphorePermit},
};

use crate::{config::ControllerConfig, reconciler::error::ActuatorError};

use self::{
    context::ReconcilerContext, infrastructure::start_infrastructure_controller,
    worker::start_worker_controller,
};

pub mod context;
pub mod infrastructure;
pub mod worker;

/// Extension type handled by this provider, resources of other types are ignored.
pub const PROVIDER_TYPE: &str = "kubevirt";

pub const OPERATION_ANNOTATION: &str = "gardener.cloud/operation";

pub async fn main_controller(client: Client, config: ControllerConfig) {
    let context = Arc::new(ReconcilerContext::new(client, config));

    join!(
        start_infrastructure_controller(context.clone()),
        start_worker_controller(context)
    );
}

/// Caps how many reconciles of one controller kind run at the same time.
pub struct ReconcileLimit(Semaphore);

impl ReconcileLimit {
    pub fn new(concurrent_reconciles: usize) -> Self {
        Self(Semaphore::new(concurrent_reconciles.max(1)))
    }

    /// Waits for a free slot, held until the permit is dropped.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, ActuatorError> {
        self.0.acquire().await.map_err(ActuatorError::ReconcileSlot)
    }

    pub fn available(&self) -> usize {
        self.0.available_permits()
    }
}

/// Operation requested on an extension resource through its annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reconcile,
    Restore,
    Migrate,
}

impl Operation {
    pub fn of(meta: &ObjectMeta) -> Self {
        let requested = meta
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(OPERATION_ANNOTATION));

        match requested.map(String::as_str) {
            Some("restore") => Operation::Restore,
            Some("migrate") => Operation::Migrate,
            _ => Operation::Reconcile,
        }
    }
}

/// Errors caused by the resource itself are retried less eagerly.
pub fn requeue_after_error(error: &FinalizerError<ActuatorError>, config: &ControllerConfig) -> Action {
    match error {
        FinalizerError::ApplyFailed(error) | FinalizerError::CleanupFailed(error)
            if error.is_configuration_error() =>
        {
            Action::requeue(config.validation_error_requeue)
        }
        _ => Action::requeue(config.error_requeue),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use tokio::time::timeout;

    use super::*;

    fn annotated(operation: &str) -> ObjectMeta {
        ObjectMeta {
            annotations: Some(BTreeMap::from([(
                OPERATION_ANNOTATION.to_owned(),
                operation.to_owned(),
            )])),
            ..Default::default()
        }
    }

    #[test]
    fn operation_is_read_from_annotation() {
        assert_eq!(Operation::of(&ObjectMeta::default()), Operation::Reconcile);
        assert_eq!(Operation::of(&annotated("reconcile")), Operation::Reconcile);
        assert_eq!(Operation::of(&annotated("restore")), Operation::Restore);
        assert_eq!(Operation::of(&annotated("migrate")), Operation::Migrate);
    }

    #[tokio::test]
    async fn reconciles_beyond_the_limit_wait_for_a_slot() {
        let limit = ReconcileLimit::new(2);

        let first = limit.acquire().await.unwrap();
        let _second = limit.acquire().await.unwrap();
        assert_eq!(limit.available(), 0);

        let blocked = timeout(Duration::from_millis(20), limit.acquire()).await;
        assert!(blocked.is_err());

        drop(first);
        let third = timeout(Duration::from_millis(20), limit.acquire()).await;
        assert!(matches!(third, Ok(Ok(_))));
    }

    #[test]
    fn default_limit_matches_the_config() {
        let limit = ReconcileLimit::new(ControllerConfig::default().concurrent_reconciles);

        assert_eq!(limit.available(), 5);
        assert_eq!(ReconcileLimit::new(0).available(), 1);
    }

    #[test]
    fn configuration_errors_wait_longer() {
        let config = ControllerConfig {
            error_requeue: Duration::from_secs(10),
            validation_error_requeue: Duration::from_secs(300),
            ..Default::default()
        };

        assert_eq!(
            requeue_after_error(
                &FinalizerError::ApplyFailed(ActuatorError::MissingObjectMetadata),
                &config
            ),
            Action::requeue(Duration::from_secs(300))
        );
        assert_eq!(
            requeue_after_error(
                &FinalizerError::CleanupFailed(ActuatorError::WorkerDelete(Box::new(
                    ActuatorError::MissingObjectMetadata
                ))),
                &config
            ),
            Action::requeue(Duration::from_secs(300))
        );
        assert_eq!(
            requeue_after_error(&FinalizerError::UnnamedObject, &config),
            Action::requeue(Duration::from_secs(10))
        );
    }
}
