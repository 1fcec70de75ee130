//! Invoking named operations on an environment server.
//!
//! [`Transport`] is the whole capability the remote proxy needs: call a
//! named operation with arguments and get a value or an error back.
//! [`TcpTransport`] speaks the length-prefixed JSON protocol to a
//! [`Server`]; [`LocalTransport`] short-circuits to an in-process
//! [`Router`](crate::Router).

pub mod framing;
mod local;
pub mod protocol;
mod server;
mod tcp;

use async_trait::async_trait;
use serde_json::Value;

use crate::env::{CallArgs, Signature};
use crate::error::Result;

/// Port an envhub server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 7860;

pub use local::LocalTransport;
pub use server::{Server, ServerConfig};
pub use tcp::{ClientConfig, Connector, TcpConnector, TcpTransport};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, api_name: &str, args: CallArgs) -> Result<Value>;

    /// Signatures of the operations the far side exports.
    async fn describe(&self) -> Result<Vec<Signature>>;
}
