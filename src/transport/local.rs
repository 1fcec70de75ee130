use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::Router;
use crate::env::{CallArgs, Signature};
use crate::error::Result;
use crate::transport::Transport;

/// Loopback transport over an in-process [`Router`].
#[derive(Debug, Clone)]
pub struct LocalTransport {
    router: Arc<Router>,
}

impl LocalTransport {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn call(&self, api_name: &str, args: CallArgs) -> Result<Value> {
        self.router.call(api_name, args).await
    }

    async fn describe(&self) -> Result<Vec<Signature>> {
        Ok(self.router.describe())
    }
}
