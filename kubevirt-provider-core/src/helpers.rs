use std::any::type_name;

use data_encoding::HEXLOWER;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::Resource;
use regex::Regex;
use sha2::{Digest, Sha256};

const QUANTITY_PATTERN: &str =
    r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)(([eE][+-]?[0-9]+)|(Ki|Mi|Gi|Ti|Pi|Ei)|[numkMGTPE])?$";

pub fn pretty_type_name<'a, T>() -> &'a str {
    let name = type_name::<T>();

    name.rsplit("::").next().unwrap_or(name)
}

/// Lowercase hex encoded SHA-256 digest of `data`
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    HEXLOWER.encode(&Sha256::digest(data.as_ref()))
}

/// `<namespace>/<name>`, or just `<name>` for cluster scoped objects
pub fn object_name<T: Resource>(object: &T) -> String {
    let meta = object.meta();
    let name = meta.name.as_deref().unwrap_or_default();

    match meta.namespace.as_deref() {
        Some(namespace) if !namespace.is_empty() => format!("{namespace}/{name}"),
        _ => name.to_owned(),
    }
}

/// Parses a Kubernetes resource quantity such as `20Gi` or `500m`.
pub fn parse_quantity(value: &str) -> Option<Quantity> {
    let pattern = Regex::new(QUANTITY_PATTERN).ok()?;
    let value = value.trim();

    pattern.is_match(value).then(|| Quantity(value.to_owned()))
}

pub trait RequireMetadata<E> {
    fn require_name_or(&self, error: E) -> Result<&str, E>;
    fn require_namespace_or(&self, error: E) -> Result<&str, E>;
    fn require_name_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E>;
    fn require_namespace_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E>;
}

impl<T: Resource, E> RequireMetadata<E> for T {
    fn require_name_or(&self, error: E) -> Result<&str, E> {
        Ok(self.meta().name.as_ref().ok_or(error)?.as_str())
    }

    fn require_namespace_or(&self, error: E) -> Result<&str, E> {
        Ok(self.meta().namespace.as_ref().ok_or(error)?.as_str())
    }

    fn require_name_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E> {
        Ok(self.meta().name.as_ref().ok_or_else(error)?.as_str())
    }

    fn require_namespace_or_else(&self, error: impl FnOnce() -> E) -> Result<&str, E> {
        Ok(self.meta().namespace.as_ref().ok_or_else(error)?.as_str())
    }
}
