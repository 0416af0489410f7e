use std::sync::Arc;

use futures::StreamExt;
use kube::{
    runtime::{
        controller::Action,
        finalizer::{finalizer, Error as FinalizerError, Event as FinalizerEvent},
        watcher::Config,
        Controller,
    },
    Api, CustomResourceExt,
};
use kubevirt_provider_core::{
    helpers::RequireMetadata, resources::crd::extensions::infrastructure::Infrastructure,
};
use log::{debug, info};

use crate::{helpers::log_reconciliation, reconciler::error::ActuatorError};

use super::{context::ReconcilerContext, requeue_after_error, Operation, PROVIDER_TYPE};

pub async fn start_infrastructure_controller(context: Arc<ReconcilerContext>) {
    info!("Creating infrastructure controller...");

    let controller = Controller::new(context.watched_api::<Infrastructure>(), Config::default())
        .shutdown_on_signal()
        .run(
            reconcile_infrastructure,
            reconcile_infrastructure_error,
            context,
        )
        .for_each(log_reconciliation);

    info!("Infrastructure controller created!");

    controller.await
}

pub async fn reconcile_infrastructure(
    object: Arc<Infrastructure>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, FinalizerError<ActuatorError>> {
    if object.spec.extension_type != PROVIDER_TYPE {
        debug!(
            "Skipping infrastructure of type '{}'",
            object.spec.extension_type
        );
        return Ok(Action::await_change());
    }

    let _slot = context
        .infrastructure_limit
        .acquire()
        .await
        .map_err(FinalizerError::ApplyFailed)?;

    let namespace = object.require_namespace_or(FinalizerError::UnnamedObject)?;
    let api: Api<Infrastructure> = Api::namespaced(context.client.clone(), namespace);
    let finalizer_name = format!("{}/cleanup", Infrastructure::crd_name());

    finalizer(&api, &finalizer_name, object, |event| async {
        match event {
            FinalizerEvent::Apply(infrastructure) => {
                try_reconcile(&infrastructure, &context).await
            }
            FinalizerEvent::Cleanup(infrastructure) => cleanup(&infrastructure, &context).await,
        }
    })
    .await
}

pub fn reconcile_infrastructure_error(
    _object: Arc<Infrastructure>,
    error: &FinalizerError<ActuatorError>,
    context: Arc<ReconcilerContext>,
) -> Action {
    requeue_after_error(error, &context.config)
}

async fn try_reconcile(
    object: &Infrastructure,
    context: &ReconcilerContext,
) -> Result<Action, ActuatorError> {
    let namespace = object.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
    let cluster = context.cluster_context(namespace).await?;

    match Operation::of(&object.metadata) {
        Operation::Reconcile => {
            let status = context.infrastructure.reconcile(object, &cluster).await?;
            debug!(
                "Infrastructure of '{namespace}' realizes {} networks",
                status.networks.len()
            );
        }
        Operation::Restore => context.infrastructure.restore(object, &cluster).await?,
        Operation::Migrate => context.infrastructure.migrate(object, &cluster).await?,
    }

    Ok(Action::requeue(context.config.success_requeue))
}

async fn cleanup(
    object: &Infrastructure,
    context: &ReconcilerContext,
) -> Result<Action, ActuatorError> {
    let namespace = object.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
    let cluster = context.cluster_context(namespace).await?;

    context.infrastructure.delete(object, &cluster).await?;

    Ok(Action::await_change())
}
