//! Session-bound dispatch.
//!
//! [`SessionBound`] turns an environment method `f(&mut self, args) -> R`
//! into an operation `f'(session_id, args) -> R`: the id is resolved through
//! the registry, the remaining arguments are bound onto the method's declared
//! [`Params`], and the method runs on the resolved instance.

use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::api::{RESET, STEP};
use crate::dispatch::Operation;
use crate::env::schema::SESSION_ID_PARAM;
use crate::env::{CallArgs, Environment, Params, Signature};
use crate::error::{Error, Result};
use crate::session::SessionRegistry;

/// Selects one method of the environment contract.
#[async_trait]
pub trait EnvMethod<E: Environment>: Send + Sync + 'static {
    /// Exported operation name.
    const NAME: &'static str;
    type Args: Params;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    async fn call(env: &mut E, args: Self::Args) -> Result<Self::Output>;

    /// The method's own signature, without the session id.
    fn signature() -> Result<Signature> {
        Ok(Signature::new(
            Self::NAME,
            Self::Args::params()?,
            type_name::<Self::Output>(),
        ))
    }
}

pub struct Reset;

pub struct Step;

#[async_trait]
impl<E: Environment> EnvMethod<E> for Reset {
    const NAME: &'static str = RESET;
    type Args = E::ResetArgs;
    type Output = E::Observation;

    async fn call(env: &mut E, args: Self::Args) -> Result<Self::Output> {
        env.reset(args).await
    }
}

#[async_trait]
impl<E: Environment> EnvMethod<E> for Step {
    const NAME: &'static str = STEP;
    type Args = E::StepArgs;
    type Output = E::StepResult;

    async fn call(env: &mut E, args: Self::Args) -> Result<Self::Output> {
        env.step(args).await
    }
}

pub struct SessionBound<E, M> {
    registry: Arc<SessionRegistry<E>>,
    signature: Signature,
    _method: PhantomData<fn() -> M>,
}

impl<E, M> SessionBound<E, M>
where
    E: Environment,
    M: EnvMethod<E>,
{
    /// Fails if the method itself declares a `session_id` parameter, which
    /// would collide with the injected one.
    pub fn new(registry: Arc<SessionRegistry<E>>) -> Result<Self> {
        let declared = M::signature()?;
        if declared.param(SESSION_ID_PARAM).is_some() {
            return Err(Error::InvalidArguments(format!(
                "{}: parameter name '{SESSION_ID_PARAM}' is reserved",
                M::NAME
            )));
        }
        Ok(Self {
            registry,
            signature: declared.session_bound(),
            _method: PhantomData,
        })
    }

    /// Typed form of the bound call.
    pub async fn call(&self, session_id: &str, args: M::Args) -> Result<M::Output> {
        let handle = self.registry.resolve_str(session_id)?;
        let mut env = handle.lock().await;
        M::call(&mut *env, args).await
    }
}

#[async_trait]
impl<E, M> Operation for SessionBound<E, M>
where
    E: Environment,
    M: EnvMethod<E>,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn invoke(&self, mut args: CallArgs) -> Result<Value> {
        let session_id = match args.take_leading(SESSION_ID_PARAM) {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(Error::InvalidArguments(format!(
                    "argument '{SESSION_ID_PARAM}' must be a string, got {other}"
                )));
            }
            None => {
                return Err(Error::InvalidArguments(format!(
                    "missing required argument '{SESSION_ID_PARAM}'"
                )));
            }
        };

        // An unknown session is reported as such whatever the other arguments.
        let handle = self.registry.resolve_str(&session_id)?;
        let bound = M::Args::bind(args)?;
        debug!(session_id = %handle.id(), op = M::NAME, "dispatching");

        let output = {
            let mut env = handle.lock().await;
            M::call(&mut *env, bound).await?
        };
        serde_json::to_value(output).map_err(|e| Error::Serialize(e.to_string()))
    }
}

impl<E, M> fmt::Debug for SessionBound<E, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBound")
            .field("signature", &self.signature)
            .field("env_type", &type_name::<E>())
            .finish()
    }
}
