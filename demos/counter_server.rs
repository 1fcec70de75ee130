//! Serves a counting environment on 127.0.0.1:7860.
//!
//! Run `cargo run --example remote_client` in another terminal to drive it.

use std::sync::Arc;
use std::time::Duration;

use envhub::transport::{Server, ServerConfig};
use envhub::{ApiExporter, EnvError, Environment, Error, Params, RegistryConfig, Router};
use envhub::{SessionRegistry, async_trait};

#[derive(Debug, Default)]
struct Counter {
    count: i64,
    limit: Option<i64>,
}

#[derive(Debug, Params)]
struct Start {
    #[param(default)]
    limit: Option<i64>,
}

#[derive(Debug, Params)]
struct Add {
    #[param(default = 1)]
    by: i64,
}

#[async_trait]
impl Environment for Counter {
    type ResetArgs = Start;
    type Observation = i64;
    type StepArgs = Add;
    type StepResult = i64;

    async fn reset(&mut self, args: Start) -> Result<i64, Error> {
        self.count = 0;
        self.limit = args.limit;
        Ok(self.count)
    }

    async fn step(&mut self, args: Add) -> Result<i64, Error> {
        let next = self.count + args.by;
        if let Some(limit) = self.limit.filter(|&limit| next > limit) {
            return Err(EnvError::msg(format!("count {next} would exceed the limit of {limit}")).into());
        }
        self.count = next;
        Ok(self.count)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(SessionRegistry::<Counter>::with_config(RegistryConfig {
        idle_timeout: Some(Duration::from_secs(15 * 60)),
        ..RegistryConfig::default()
    }));
    let _sweeper = registry.spawn_sweeper();

    let mut router = Router::new();
    ApiExporter::new(registry).register(&mut router)?;

    let server = Server::bind(Arc::new(router), ServerConfig::default()).await?;
    server
        .serve_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
