use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::env::{CallArgs, Signature};
use crate::error::Result;

/// A named, externally invocable callable with an introspectable signature.
///
/// This is the unit the serving layer deals in: it never sees environment
/// types, only JSON arguments in and a JSON value (or an error) out.
#[async_trait]
pub trait Operation: Send + Sync {
    fn signature(&self) -> &Signature;

    fn name(&self) -> &str {
        &self.signature().name
    }

    async fn invoke(&self, args: CallArgs) -> Result<Value>;
}

/// Anything operations can be registered with.
pub trait OperationSink {
    fn contains(&self, name: &str) -> bool;

    /// Attaches `op` under its name. Names are unique per sink.
    fn mount(&mut self, op: Arc<dyn Operation>) -> Result<()>;
}
