use std::fmt::Display;

use kube::{
    runtime::{
        controller::{Action, Error as ControllerError},
        reflector::ObjectRef,
        watcher::Error as WatcherError,
    },
    Resource,
};
use kubevirt_provider_core::helpers::pretty_type_name;
use log::{debug, error, info, warn};

/// Logs the outcome of a single pass of a controller stream.
pub async fn log_reconciliation<T, E>(
    result: Result<(ObjectRef<T>, Action), ControllerError<E, WatcherError>>,
) where
    T: Resource,
    E: Display,
{
    let kind = pretty_type_name::<T>();

    match result {
        Ok((object, action)) => info!(
            "Reconciled {kind} '{}'. Next action: {action:?}",
            describe(&object.name, object.namespace.as_deref())
        ),
        Err(ControllerError::ObjectNotFound(object)) => debug!(
            "{kind} '{}' is gone, skipping",
            describe(&object.name, object.namespace.as_deref())
        ),
        Err(ControllerError::ReconcilerFailed(reason, object)) => warn!(
            "{kind} '{}' failed to reconcile! Reason: {reason}",
            describe(&object.name, object.namespace.as_deref())
        ),
        Err(ControllerError::QueueError(reason)) => error!("{kind} watcher has failed! {reason}"),
    }
}

fn describe(name: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) => format!("{namespace}/{name}"),
        None => name.to_owned(),
    }
}
