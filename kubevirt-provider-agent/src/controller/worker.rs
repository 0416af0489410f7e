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
    helpers::RequireMetadata, resources::crd::extensions::worker::Worker,
};
use log::{debug, info};

use crate::{helpers::log_reconciliation, reconciler::error::ActuatorError};

use super::{context::ReconcilerContext, requeue_after_error, Operation, PROVIDER_TYPE};

pub async fn start_worker_controller(context: Arc<ReconcilerContext>) {
    info!("Creating worker controller...");

    let controller = Controller::new(context.watched_api::<Worker>(), Config::default())
        .shutdown_on_signal()
        .run(reconcile_worker, reconcile_worker_error, context)
        .for_each(log_reconciliation);

    info!("Worker controller created!");

    controller.await
}

pub async fn reconcile_worker(
    object: Arc<Worker>,
    context: Arc<ReconcilerContext>,
) -> Result<Action, FinalizerError<ActuatorError>> {
    if object.spec.extension_type != PROVIDER_TYPE {
        debug!("Skipping worker of type '{}'", object.spec.extension_type);
        return Ok(Action::await_change());
    }

    let _slot = context
        .worker_limit
        .acquire()
        .await
        .map_err(FinalizerError::ApplyFailed)?;

    let namespace = object.require_namespace_or(FinalizerError::UnnamedObject)?;
    let api: Api<Worker> = Api::namespaced(context.client.clone(), namespace);
    let finalizer_name = format!("{}/cleanup", Worker::crd_name());

    finalizer(&api, &finalizer_name, object, |event| async {
        match event {
            FinalizerEvent::Apply(worker) => try_reconcile(&worker, &context).await,
            FinalizerEvent::Cleanup(worker) => cleanup(&worker, &context).await,
        }
    })
    .await
}

pub fn reconcile_worker_error(
    _object: Arc<Worker>,
    error: &FinalizerError<ActuatorError>,
    context: Arc<ReconcilerContext>,
) -> Action {
    requeue_after_error(error, &context.config)
}

async fn try_reconcile(object: &Worker, context: &ReconcilerContext) -> Result<Action, ActuatorError> {
    let namespace = object.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
    let cluster = context.cluster_context(namespace).await?;

    match Operation::of(&object.metadata) {
        Operation::Reconcile => context.worker.reconcile(object, &cluster).await?,
        Operation::Restore => context.worker.restore(object, &cluster).await?,
        Operation::Migrate => context.worker.migrate(object, &cluster).await?,
    }

    Ok(Action::requeue(context.config.success_requeue))
}

async fn cleanup(object: &Worker, context: &ReconcilerContext) -> Result<Action, ActuatorError> {
    let namespace = object.require_namespace_or(ActuatorError::MissingObjectMetadata)?;
    let cluster = context.cluster_context(namespace).await?;

    context.worker.delete(object, &cluster).await?;

    Ok(Action::await_change())
}
