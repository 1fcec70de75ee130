//! Serve stateful environments to many clients at once.
//!
//! A server wraps an [`Environment`] type behind three operations:
//! `init` creates a fresh instance and returns its session id, and
//! `reset`/`step` take that id as their first argument and route to the
//! matching instance. On the other end, [`RemoteEnvironment`] performs
//! `init` once and then behaves like a local environment.
//!
//! ```no_run
//! use envhub::{Router, register_env};
//! use envhub::transport::{Server, ServerConfig};
//! # use envhub::{Environment, Error, Params};
//! # #[derive(Default)] struct Counter(i64);
//! # #[derive(Params)] struct By { #[param(default = 1)] by: i64 }
//! # #[envhub::async_trait]
//! # impl Environment for Counter {
//! #     type ResetArgs = (); type Observation = i64; type StepArgs = By; type StepResult = i64;
//! #     async fn reset(&mut self, _: ()) -> Result<i64, Error> { self.0 = 0; Ok(0) }
//! #     async fn step(&mut self, a: By) -> Result<i64, Error> { self.0 += a.by; Ok(self.0) }
//! # }
//!
//! # async fn run() -> envhub::Result<()> {
//! let mut router = Router::new();
//! register_env::<Counter, _>(&mut router)?;
//! Server::bind(router.into(), ServerConfig::default()).await?.serve().await
//! # }
//! ```

// Lets the derive macro's `::envhub::` paths resolve inside this crate.
extern crate self as envhub;

pub mod api;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod remote;
pub mod session;
pub mod transport;

#[cfg(test)]
mod fixtures;

pub use async_trait::async_trait;
pub use envhub_macros::Params;

pub use api::{ApiExporter, Exported, Router, register_env};
pub use dispatch::{Operation, OperationSink, SessionBound};
pub use env::{CallArgs, EnvError, Environment, ParamSpec, Params, Signature};
pub use error::{Error, Result};
pub use remote::{EndpointId, RemoteEnvironment};
pub use session::{RegistryConfig, SessionId, SessionRegistry};
