//! Declared argument schemas and call binding.
//!
//! Every environment method takes one [`Params`] type. Its fields are the
//! method's parameters, in order. Callers send [`CallArgs`] (positional
//! values plus keyword values) and a [`Binder`] maps them onto the fields:
//! positional first, then by name, then the declared default.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::env::schema::ParamSpec;
use crate::error::{Error, Result};

/// The wire form of `*args, **kwargs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    #[serde(default)]
    pub positional: Vec<Value>,
    #[serde(default)]
    pub named: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Map::new(),
        }
    }

    pub fn push<T: Serialize>(&mut self, value: T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
        self.positional.push(value);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn arg<T: Serialize>(mut self, value: T) -> Result<Self> {
        self.push(value)?;
        Ok(self)
    }

    /// Adds a keyword argument.
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialize(e.to_string()))?;
        self.named.insert(name.into(), value);
        Ok(self)
    }

    pub fn prepend(&mut self, value: Value) {
        self.positional.insert(0, value);
    }

    /// Removes and returns the argument bound to `name` when it is the
    /// leading parameter: the keyword form wins, otherwise the first
    /// positional value.
    pub fn take_leading(&mut self, name: &str) -> Option<Value> {
        if let Some(value) = self.named.remove(name) {
            return Some(value);
        }
        if self.positional.is_empty() {
            None
        } else {
            Some(self.positional.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A declared, serializable argument schema for one environment method.
///
/// Usually derived:
///
/// ```
/// use envhub::Params;
///
/// #[derive(Params)]
/// struct Move {
///     direction: String,
///     #[param(default = 1)]
///     distance: u32,
/// }
/// ```
pub trait Params: Sized + Send + 'static {
    /// Parameter descriptors, in declaration order. Fails if a declared
    /// default cannot be serialized.
    fn params() -> Result<Vec<ParamSpec>>;

    /// Binds caller arguments onto the schema.
    fn bind(args: CallArgs) -> Result<Self>;

    /// Converts back to positional call arguments.
    fn into_args(self) -> Result<CallArgs>;
}

impl Params for () {
    fn params() -> Result<Vec<ParamSpec>> {
        Ok(Vec::new())
    }

    fn bind(args: CallArgs) -> Result<Self> {
        Binder::new(args).finish()
    }

    fn into_args(self) -> Result<CallArgs> {
        Ok(CallArgs::new())
    }
}

/// Untyped pass-through; used by the remote proxy, which forwards whatever
/// the caller supplies.
impl Params for CallArgs {
    fn params() -> Result<Vec<ParamSpec>> {
        Ok(Vec::new())
    }

    fn bind(args: CallArgs) -> Result<Self> {
        Ok(args)
    }

    fn into_args(self) -> Result<CallArgs> {
        Ok(self)
    }
}

/// Consumes [`CallArgs`] parameter by parameter, in declaration order.
#[derive(Debug)]
pub struct Binder {
    positional: Vec<Option<Value>>,
    named: Map<String, Value>,
    next: usize,
}

impl Binder {
    pub fn new(args: CallArgs) -> Self {
        Self {
            positional: args.positional.into_iter().map(Some).collect(),
            named: args.named,
            next: 0,
        }
    }

    pub fn required<T: DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        match self.take(name)? {
            Some(value) => decode(name, value),
            None => Err(Error::InvalidArguments(format!(
                "missing required argument '{name}'"
            ))),
        }
    }

    pub fn optional<T, F>(&mut self, name: &str, default: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.take(name)? {
            Some(value) => decode(name, value),
            None => Ok(default()),
        }
    }

    /// Fails if any argument was left unbound.
    pub fn finish(self) -> Result<()> {
        if self.positional.len() > self.next {
            return Err(Error::InvalidArguments(format!(
                "takes {} positional arguments but {} were given",
                self.next,
                self.positional.len()
            )));
        }
        if let Some(name) = self.named.keys().next() {
            return Err(Error::InvalidArguments(format!(
                "unexpected keyword argument '{name}'"
            )));
        }
        Ok(())
    }

    fn take(&mut self, name: &str) -> Result<Option<Value>> {
        let index = self.next;
        self.next += 1;

        let positional = self.positional.get_mut(index).and_then(Option::take);
        let named = self.named.remove(name);
        match (positional, named) {
            (Some(_), Some(_)) => Err(Error::InvalidArguments(format!(
                "got multiple values for argument '{name}'"
            ))),
            (Some(value), None) | (None, Some(value)) => Ok(Some(value)),
            (None, None) => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidArguments(format!("argument '{name}': {e}")))
}
