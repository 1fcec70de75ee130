use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::dispatch::{Operation, OperationSink};
use crate::env::{CallArgs, Signature};
use crate::error::{Error, Result};

/// In-process operation table; the serving layer behind [`Server`] and
/// [`LocalTransport`].
///
/// [`Server`]: crate::transport::Server
/// [`LocalTransport`]: crate::transport::LocalTransport
#[derive(Default)]
pub struct Router {
    ops: BTreeMap<String, Arc<dyn Operation>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up an operation. A leading `/` on the name is ignored.
    pub fn get(&self, api_name: &str) -> Option<&Arc<dyn Operation>> {
        self.ops.get(normalize(api_name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ops.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Signatures of every mounted operation, ordered by name.
    pub fn describe(&self) -> Vec<Signature> {
        self.ops.values().map(|op| op.signature().clone()).collect()
    }

    pub async fn call(&self, api_name: &str, args: CallArgs) -> Result<Value> {
        let op = self
            .get(api_name)
            .ok_or_else(|| Error::UnknownOperation(api_name.to_string()))?;
        debug!(op = op.name(), args = args.len(), "routing call");
        op.invoke(args).await
    }
}

impl OperationSink for Router {
    fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(normalize(name))
    }

    fn mount(&mut self, op: Arc<dyn Operation>) -> Result<()> {
        match self.ops.entry(normalize(op.name()).to_string()) {
            Entry::Occupied(entry) => Err(Error::DuplicateOperation(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(op);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("operations", &self.ops.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalize(api_name: &str) -> &str {
    api_name.trim_start_matches('/')
}
