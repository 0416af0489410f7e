use std::{
    borrow::Cow,
    env::{var, VarError},
    num::ParseIntError,
    time::Duration,
};

use kubevirt_provider_core::kubernetes::retry::Backoff;
use thiserror::Error;

pub const DEFAULT_FIELD_MANAGER: &str = "kubevirt-provider-agent";

const FIELD_MANAGER_VAR: &str = "KUBEVIRT_PROVIDER_FIELD_MANAGER";
const WATCH_NAMESPACE_VAR: &str = "KUBEVIRT_PROVIDER_WATCH_NAMESPACE";
const SUCCESS_REQUEUE_SECS_VAR: &str = "KUBEVIRT_PROVIDER_SUCCESS_REQUEUE_SECS";
const ERROR_REQUEUE_SECS_VAR: &str = "KUBEVIRT_PROVIDER_ERROR_REQUEUE_SECS";
const VALIDATION_ERROR_REQUEUE_SECS_VAR: &str = "KUBEVIRT_PROVIDER_VALIDATION_ERROR_REQUEUE_SECS";
const RETRY_STEPS_VAR: &str = "KUBEVIRT_PROVIDER_RETRY_STEPS";
const CONCURRENT_RECONCILES_VAR: &str = "KUBEVIRT_PROVIDER_CONCURRENT_RECONCILES";

const DEFAULT_SUCCESS_REQUEUE_SECS: u64 = 60 * 5;
const DEFAULT_ERROR_REQUEUE_SECS: u64 = 10;
const DEFAULT_VALIDATION_ERROR_REQUEUE_SECS: u64 = 60 * 5;
const DEFAULT_CONCURRENT_RECONCILES: usize = 5;

#[derive(Debug, Error)]
pub enum FromError {
    #[error("Env var unavailable: {}", .0)]
    VarUnset(VarError),
    #[error("Env var '{}' couldn't be parsed: {}", .0, .1)]
    IntParse(Cow<'static, str>, ParseIntError),
}

/// Runtime settings of the controllers, read from `KUBEVIRT_PROVIDER_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub field_manager: String,
    /// all namespaces when unset
    pub watch_namespace: Option<String>,
    pub success_requeue: Duration,
    pub error_requeue: Duration,
    /// requeue delay of errors that need a change of the resource to go away
    pub validation_error_requeue: Duration,
    pub backoff: Backoff,
    /// reconciles running at once, per controller kind
    pub concurrent_reconciles: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            field_manager: DEFAULT_FIELD_MANAGER.to_owned(),
            watch_namespace: None,
            success_requeue: Duration::from_secs(DEFAULT_SUCCESS_REQUEUE_SECS),
            error_requeue: Duration::from_secs(DEFAULT_ERROR_REQUEUE_SECS),
            validation_error_requeue: Duration::from_secs(DEFAULT_VALIDATION_ERROR_REQUEUE_SECS),
            backoff: Backoff::default(),
            concurrent_reconciles: DEFAULT_CONCURRENT_RECONCILES,
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, FromError> {
        Self::from_lookup(|key| match var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(error) => Err(FromError::VarUnset(error)),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FromError>
    where
        F: Fn(&'static str) -> Result<Option<String>, FromError>,
    {
        let defaults = Self::default();
        let seconds = |key: &'static str, default: Duration| -> Result<Duration, FromError> {
            match lookup(key)? {
                Some(value) => value
                    .trim()
                    .parse()
                    .map(Duration::from_secs)
                    .map_err(|error| FromError::IntParse(key.into(), error)),
                None => Ok(default),
            }
        };

        let backoff = match lookup(RETRY_STEPS_VAR)? {
            Some(steps) => Backoff {
                steps: steps
                    .trim()
                    .parse()
                    .map_err(|error| FromError::IntParse(RETRY_STEPS_VAR.into(), error))?,
                ..defaults.backoff
            },
            None => defaults.backoff,
        };

        let concurrent_reconciles = match lookup(CONCURRENT_RECONCILES_VAR)? {
            Some(limit) => limit
                .trim()
                .parse::<usize>()
                .map_err(|error| FromError::IntParse(CONCURRENT_RECONCILES_VAR.into(), error))?
                .max(1),
            None => defaults.concurrent_reconciles,
        };

        Ok(Self {
            field_manager: lookup(FIELD_MANAGER_VAR)?.unwrap_or(defaults.field_manager),
            watch_namespace: lookup(WATCH_NAMESPACE_VAR)?.filter(|namespace| !namespace.is_empty()),
            success_requeue: seconds(SUCCESS_REQUEUE_SECS_VAR, defaults.success_requeue)?,
            error_requeue: seconds(ERROR_REQUEUE_SECS_VAR, defaults.error_requeue)?,
            validation_error_requeue: seconds(
                VALIDATION_ERROR_REQUEUE_SECS_VAR,
                defaults.validation_error_requeue,
            )?,
            backoff,
            concurrent_reconciles,
        })
    }
}
