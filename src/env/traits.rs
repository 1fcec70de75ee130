use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::env::params::Params;
use crate::error::Error;

/// A stateful, turn-based environment.
///
/// Implementations declare the argument schema of each method as a
/// [`Params`] type (usually via `#[derive(Params)]`) so the exporter can
/// publish an exact signature without runtime introspection. Observations
/// and step results must survive a JSON round trip to be usable remotely.
///
/// Environment-defined failures are returned as
/// [`Error::Environment`](crate::Error::Environment); `?` on an
/// [`EnvError`](crate::env::EnvError) does the conversion.
///
/// ## Example
/// ```
/// use envhub::{Environment, Error, Params};
///
/// #[derive(Default)]
/// struct Echo;
///
/// #[derive(Params)]
/// struct Action {
///     action: String,
/// }
///
/// #[async_trait::async_trait]
/// impl Environment for Echo {
///     type ResetArgs = ();
///     type Observation = String;
///     type StepArgs = Action;
///     type StepResult = String;
///
///     async fn reset(&mut self, _: ()) -> Result<String, Error> {
///         Ok("ready".into())
///     }
///
///     async fn step(&mut self, args: Action) -> Result<String, Error> {
///         Ok(format!("did {}", args.action))
///     }
/// }
/// ```
#[async_trait]
pub trait Environment: Send + 'static {
    type ResetArgs: Params;
    type Observation: Serialize + DeserializeOwned + Send + 'static;
    type StepArgs: Params;
    type StepResult: Serialize + DeserializeOwned + Send + 'static;

    /// Start or restart an episode.
    async fn reset(&mut self, args: Self::ResetArgs) -> Result<Self::Observation, Error>;

    /// Advance the episode by one action.
    async fn step(&mut self, args: Self::StepArgs) -> Result<Self::StepResult, Error>;
}
