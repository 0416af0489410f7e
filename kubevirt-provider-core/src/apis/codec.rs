use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::API_VERSION;

/// A provider object that is embedded as raw JSON in an extension resource.
pub trait ProviderObject: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Expected a JSON object for {}!", .0)]
    NotAnObject(&'static str),
    #[error("Unsupported apiVersion '{}' for {}!", .1, .0)]
    UnsupportedVersion(&'static str, String),
    #[error("Unexpected kind '{}', expected {}!", .1, .0)]
    UnexpectedKind(&'static str, String),
    #[error("Couldn't decode {}! Reason: {}", .0, .1)]
    Decode(&'static str, serde_json::Error),
    #[error("Couldn't encode {}! Reason: {}", .0, .1)]
    Encode(&'static str, serde_json::Error),
}

/// Decodes and encodes provider objects, stamping and checking their type
/// information. Constructed once and handed to every component that reads
/// or writes provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderCodec {
    api_version: String,
}

impl Default for ProviderCodec {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
        }
    }
}

impl ProviderCodec {
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn decode<T: ProviderObject>(&self, raw: &Value) -> Result<T, CodecError> {
        let object = raw.as_object().ok_or(CodecError::NotAnObject(T::KIND))?;

        if let Some(api_version) = object.get("apiVersion").and_then(Value::as_str) {
            if api_version != self.api_version {
                return Err(CodecError::UnsupportedVersion(
                    T::KIND,
                    api_version.to_owned(),
                ));
            }
        }

        if let Some(kind) = object.get("kind").and_then(Value::as_str) {
            if kind != T::KIND {
                return Err(CodecError::UnexpectedKind(T::KIND, kind.to_owned()));
            }
        }

        let mut fields = object.clone();
        fields.remove("apiVersion");
        fields.remove("kind");

        serde_json::from_value(Value::Object(fields)).map_err(|err| CodecError::Decode(T::KIND, err))
    }

    /// Decodes `raw` when present, otherwise returns the defaulted object.
    pub fn decode_or_default<T: ProviderObject + Default>(
        &self,
        raw: Option<&Value>,
    ) -> Result<T, CodecError> {
        match raw {
            Some(Value::Null) | None => Ok(T::default()),
            Some(raw) => self.decode(raw),
        }
    }

    pub fn encode<T: ProviderObject>(&self, object: &T) -> Result<Value, CodecError> {
        let value = serde_json::to_value(object).map_err(|err| CodecError::Encode(T::KIND, err))?;

        let mut stamped = Map::new();
        stamped.insert("apiVersion".to_owned(), Value::String(self.api_version.clone()));
        stamped.insert("kind".to_owned(), Value::String(T::KIND.to_owned()));

        match value {
            Value::Object(fields) => stamped.extend(fields),
            _ => return Err(CodecError::NotAnObject(T::KIND)),
        }

        Ok(Value::Object(stamped))
    }
}
