//! Signature descriptors for exported operations.
//!
//! A [`Signature`] is what an external caller sees of an operation: its
//! name, ordered parameters (with types and defaults) and return type. For
//! session-bound methods it is built from the environment's declared
//! [`Params`](crate::env::Params) schema plus a leading `session_id`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Name of the parameter every session-bound operation takes first.
pub const SESSION_ID_PARAM: &str = "session_id";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    /// Rust type name of the parameter.
    #[serde(rename = "type")]
    pub ty: String,
    /// JSON form of the default, `None` for required parameters. A `null`
    /// default (e.g. an `Option` field) is `Some(Value::Null)`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub default: Option<Value>,
}

/// A `default` key that is present, even as `null`, declares a default.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            default: None,
        }
    }

    /// A required parameter of type `T`.
    pub fn of<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::required(name, std::any::type_name::<T>())
    }

    /// An optional parameter of type `T` whose default is `value`.
    /// Fails if `value` has no JSON form.
    pub fn defaulted<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self> {
        let name = name.into();
        let default = serde_json::to_value(value)
            .map_err(|e| Error::Serialize(format!("default for '{name}': {e}")))?;
        Ok(Self::of::<T>(name).with_default(default))
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub params: Vec<ParamSpec>,
    pub returns: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<ParamSpec>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params,
            returns: returns.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The same signature with a required `session_id: String` inserted
    /// before every other parameter.
    pub fn session_bound(&self) -> Self {
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(ParamSpec::of::<String>(SESSION_ID_PARAM));
        params.extend(self.params.iter().cloned());
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            params,
            returns: self.returns.clone(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}
