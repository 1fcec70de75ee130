//! Exposes one environment type as the `init` / `reset` / `step` operations.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::api::INIT;
use crate::dispatch::{Operation, OperationSink, Reset, SessionBound, Step};
use crate::env::{CallArgs, EnvError, Environment, Signature};
use crate::error::{Error, Result};
use crate::session::{SessionId, SessionRegistry};

type Factory<E> = Arc<dyn Fn() -> Result<E, EnvError> + Send + Sync>;

/// The `init` operation: builds a fresh instance and returns its session id.
pub struct Init<E> {
    registry: Arc<SessionRegistry<E>>,
    factory: Factory<E>,
    signature: Signature,
}

impl<E: Environment> Init<E> {
    fn new(registry: Arc<SessionRegistry<E>>, factory: Factory<E>) -> Self {
        Self {
            registry,
            factory,
            signature: Signature::new(INIT, Vec::new(), type_name::<String>())
                .with_description("Initialize a new environment session"),
        }
    }

    pub fn init(&self) -> Result<SessionId> {
        self.registry.create(|| (self.factory)())
    }
}

#[async_trait]
impl<E: Environment> Operation for Init<E> {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn invoke(&self, args: CallArgs) -> Result<Value> {
        if !args.is_empty() {
            return Err(Error::InvalidArguments(format!(
                "{INIT} takes no arguments but {} were given",
                args.len()
            )));
        }
        let id = self.init()?;
        Ok(Value::String(id.to_string()))
    }
}

/// Builds the three operations for `E` over a shared registry.
///
/// Registering consumes the exporter: an environment type is attached to a
/// sink once and stays attached.
pub struct ApiExporter<E> {
    registry: Arc<SessionRegistry<E>>,
    factory: Factory<E>,
}

impl<E: Environment + Default> ApiExporter<E> {
    /// Instances are built with `E::default()`.
    pub fn new(registry: Arc<SessionRegistry<E>>) -> Self {
        Self::with_factory(registry, || Ok(E::default()))
    }
}

impl<E: Environment> ApiExporter<E> {
    pub fn with_factory<F>(registry: Arc<SessionRegistry<E>>, factory: F) -> Self
    where
        F: Fn() -> Result<E, EnvError> + Send + Sync + 'static,
    {
        Self {
            registry,
            factory: Arc::new(factory),
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<E>> {
        &self.registry
    }

    pub fn operations(&self) -> Result<Vec<Arc<dyn Operation>>> {
        let init = Init::new(Arc::clone(&self.registry), Arc::clone(&self.factory));
        let reset = SessionBound::<E, Reset>::new(Arc::clone(&self.registry))?;
        let step = SessionBound::<E, Step>::new(Arc::clone(&self.registry))?;
        Ok(vec![Arc::new(init), Arc::new(reset), Arc::new(step)])
    }

    /// Mounts all three operations, or none if any name is already taken.
    pub fn register<S>(self, sink: &mut S) -> Result<Exported<E>>
    where
        S: OperationSink + ?Sized,
    {
        let ops = self.operations()?;
        if let Some(taken) = ops.iter().find(|op| sink.contains(op.name())) {
            return Err(Error::DuplicateOperation(taken.name().to_string()));
        }

        let operations: Vec<String> = ops.iter().map(|op| op.name().to_string()).collect();
        for op in ops {
            sink.mount(op)?;
        }
        info!(env = type_name::<E>(), ?operations, "registered environment");

        Ok(Exported {
            registry: self.registry,
            operations,
        })
    }
}

impl<E> fmt::Debug for ApiExporter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiExporter")
            .field("env_type", &type_name::<E>())
            .finish()
    }
}

/// An environment type attached to a sink.
#[derive(Debug)]
pub struct Exported<E> {
    registry: Arc<SessionRegistry<E>>,
    operations: Vec<String>,
}

impl<E> Exported<E> {
    pub fn registry(&self) -> &Arc<SessionRegistry<E>> {
        &self.registry
    }

    pub fn operations(&self) -> &[String] {
        &self.operations
    }
}

/// Registers `E` with a fresh default registry.
///
/// ```
/// # use envhub::{Environment, Error, Params, Router, register_env};
/// # #[derive(Default)] struct Coin;
/// # #[derive(Params)] struct Guess { heads: bool }
/// # #[envhub::async_trait]
/// # impl Environment for Coin {
/// #     type ResetArgs = (); type Observation = (); type StepArgs = Guess; type StepResult = bool;
/// #     async fn reset(&mut self, _: ()) -> Result<(), Error> { Ok(()) }
/// #     async fn step(&mut self, g: Guess) -> Result<bool, Error> { Ok(g.heads) }
/// # }
/// let mut router = Router::new();
/// let exported = register_env::<Coin, _>(&mut router).unwrap();
/// assert_eq!(exported.operations(), ["init", "reset", "step"]);
/// ```
pub fn register_env<E, S>(sink: &mut S) -> Result<Exported<E>>
where
    E: Environment + Default,
    S: OperationSink + ?Sized,
{
    ApiExporter::new(Arc::new(SessionRegistry::new())).register(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Router;
    use crate::fixtures::{Echo, Shout, Tally};
    use serde_json::json;

    fn positional(values: Vec<Value>) -> CallArgs {
        CallArgs::from_values(values)
    }

    async fn init(router: &Router) -> String {
        let id = router.call("init", CallArgs::new()).await.unwrap();
        id.as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn init_reset_step_scenario() {
        let mut router = Router::new();
        register_env::<Echo, _>(&mut router).unwrap();

        let id = init(&router).await;
        let ready = router.call("reset", positional(vec![json!(id)])).await.unwrap();
        assert_eq!(ready, json!("ready"));

        let did = router
            .call("step", positional(vec![json!(id), json!("jump")]))
            .await
            .unwrap();
        assert_eq!(did, json!("did jump"));

        let err = router
            .call("reset", positional(vec![json!("bogus-id")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSession(s) if s == "bogus-id"));
    }

    #[tokio::test]
    async fn sessions_evolve_independently() {
        let mut router = Router::new();
        let exported = register_env::<Tally, _>(&mut router).unwrap();

        let a = init(&router).await;
        let b = init(&router).await;
        assert_ne!(a, b);
        assert_eq!(exported.registry().len(), 2);

        for _ in 0..3 {
            router.call("step", positional(vec![json!(a)])).await.unwrap();
        }
        let b_total = router
            .call("step", positional(vec![json!(b), json!(10)]))
            .await
            .unwrap();
        assert_eq!(b_total, json!(10));

        // b's episode saw one step regardless of a's three.
        let b_steps = router.call("reset", positional(vec![json!(b)])).await.unwrap();
        assert_eq!(b_steps, json!(1));
        let a_steps = router.call("reset", positional(vec![json!(a)])).await.unwrap();
        assert_eq!(a_steps, json!(3));
    }

    #[tokio::test]
    async fn construction_failure_is_propagated() {
        let registry = Arc::new(SessionRegistry::<Echo>::new());
        let mut router = Router::new();
        ApiExporter::with_factory(Arc::clone(&registry), || {
            Err(EnvError::msg("assets missing"))
        })
        .register(&mut router)
        .unwrap();

        let err = router.call("init", CallArgs::new()).await.unwrap_err();
        assert!(matches!(&err, Error::Construction(e) if e.to_string() == "assets missing"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn init_rejects_arguments() {
        let mut router = Router::new();
        register_env::<Echo, _>(&mut router).unwrap();
        let err = router
            .call("init", positional(vec![json!("unexpected")]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }

    #[test]
    fn registration_is_all_or_nothing() {
        let mut router = Router::new();
        register_env::<Echo, _>(&mut router).unwrap();

        let err = register_env::<Tally, _>(&mut router).unwrap_err();
        assert!(matches!(err, Error::DuplicateOperation(name) if name == "init"));
        assert_eq!(router.len(), 3);

        let mut fresh = Router::new();
        let err = register_env::<Shout, _>(&mut fresh).unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
        assert!(fresh.is_empty());
    }

    #[test]
    fn described_api_has_session_id_first() {
        let mut router = Router::new();
        register_env::<Tally, _>(&mut router).unwrap();

        let described = router.describe();
        let names: Vec<_> = described.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["init", "reset", "step"]);

        assert!(described[0].params.is_empty());
        assert_eq!(described[0].returns, type_name::<String>());
        for sig in &described[1..] {
            assert_eq!(sig.params[0].name, "session_id");
        }
        assert_eq!(described[2].params[1].name, "by");
        assert_eq!(described[1].returns, type_name::<u32>());
    }

    #[tokio::test]
    async fn leading_slash_api_names_resolve() {
        let mut router = Router::new();
        register_env::<Echo, _>(&mut router).unwrap();

        let id = router.call("/init", CallArgs::new()).await.unwrap();
        let out = router.call("/reset", positional(vec![id])).await.unwrap();
        assert_eq!(out, json!("ready"));

        let err = router.call("/close", CallArgs::new()).await.unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(_)));
    }

    #[test]
    fn independent_exporters_share_nothing() {
        let first = Arc::new(SessionRegistry::<Echo>::new());
        let second = Arc::new(SessionRegistry::<Echo>::new());
        let mut r1 = Router::new();
        let mut r2 = Router::new();
        let e1 = ApiExporter::new(Arc::clone(&first)).register(&mut r1).unwrap();
        ApiExporter::new(Arc::clone(&second)).register(&mut r2).unwrap();

        let id = e1.registry().create(|| Ok(Echo::default())).unwrap();
        assert!(first.contains(&id));
        assert!(!second.contains(&id));
    }
}
