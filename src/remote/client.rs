use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use crate::api::{INIT, RESET, STEP};
use crate::env::schema::SESSION_ID_PARAM;
use crate::env::{CallArgs, Environment, Params, Signature};
use crate::error::{Error, Result};
use crate::remote::endpoint::{EndpointId, HostedResolver, Resolver};
use crate::transport::{Connector, TcpConnector, TcpTransport, Transport};

/// An environment running on a remote server.
///
/// Construction performs the remote `init` and keeps the returned session
/// id for the proxy's whole life; every `reset`/`step` sends it as the first
/// argument. There is no re-initialization: if the server forgets the
/// session, calls fail with [`Error::InvalidSession`] and the proxy should
/// be replaced by a fresh [`load`](RemoteEnvironment::load).
pub struct RemoteEnvironment<T = TcpTransport> {
    transport: T,
    session_id: String,
    endpoint: Option<EndpointId>,
}

impl RemoteEnvironment<TcpTransport> {
    /// Resolves `owner/name` with the default [`HostedResolver`] and connects
    /// over TCP to the envhub server listening there on
    /// [`DEFAULT_PORT`](crate::transport::DEFAULT_PORT).
    pub async fn load(endpoint_id: &str) -> Result<Self> {
        Self::load_with(endpoint_id, &HostedResolver::default(), &TcpConnector::default()).await
    }
}

impl<T> RemoteEnvironment<T>
where
    T: Transport + 'static,
{
    pub async fn load_with<R, C>(endpoint_id: &str, resolver: &R, connector: &C) -> Result<Self>
    where
        R: Resolver + ?Sized,
        C: Connector<Transport = T> + ?Sized,
    {
        let endpoint: EndpointId = endpoint_id.parse()?;
        let addr = resolver.resolve(&endpoint)?;
        let transport = connector.connect(&addr).await?;

        let mut env = Self::connect(transport).await?;
        env.endpoint = Some(endpoint);
        Ok(env)
    }

    /// Starts a remote session over an already established transport.
    pub async fn connect(transport: T) -> Result<Self> {
        let session_id = match transport.call(INIT, CallArgs::new()).await? {
            Value::String(id) => id,
            other => {
                return Err(Error::Deserialize(format!(
                    "init returned {other}, expected a session id string"
                )));
            }
        };
        info!(%session_id, "remote session initialized");
        Ok(Self {
            transport,
            session_id,
            endpoint: None,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn endpoint(&self) -> Option<&EndpointId> {
        self.endpoint.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Signatures the remote server exports.
    pub async fn view_api(&self) -> Result<Vec<Signature>> {
        self.transport.describe().await
    }

    /// `reset` with a declared argument type and a typed observation.
    pub async fn reset_with<P, O>(&self, args: P) -> Result<O>
    where
        P: Params,
        O: DeserializeOwned,
    {
        let value = self.forward(RESET, args.into_args()?).await?;
        decode(value)
    }

    /// `step` with a declared argument type and a typed result.
    pub async fn step_with<P, O>(&self, args: P) -> Result<O>
    where
        P: Params,
        O: DeserializeOwned,
    {
        let value = self.forward(STEP, args.into_args()?).await?;
        decode(value)
    }

    async fn forward(&self, api_name: &str, mut args: CallArgs) -> Result<Value> {
        if args.named.contains_key(SESSION_ID_PARAM) {
            return Err(Error::InvalidArguments(format!(
                "'{SESSION_ID_PARAM}' is supplied by the remote environment"
            )));
        }
        args.prepend(Value::String(self.session_id.clone()));
        self.transport.call(api_name, args).await
    }
}

fn decode<O: DeserializeOwned>(value: Value) -> Result<O> {
    serde_json::from_value(value).map_err(|e| Error::Deserialize(e.to_string()))
}

#[async_trait]
impl<T> Environment for RemoteEnvironment<T>
where
    T: Transport + 'static,
{
    type ResetArgs = CallArgs;
    type Observation = Value;
    type StepArgs = CallArgs;
    type StepResult = Value;

    async fn reset(&mut self, args: CallArgs) -> Result<Value> {
        self.forward(RESET, args).await
    }

    async fn step(&mut self, args: CallArgs) -> Result<Value> {
        self.forward(STEP, args).await
    }
}

impl<T: fmt::Debug> fmt::Debug for RemoteEnvironment<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEnvironment")
            .field("endpoint", &self.endpoint)
            .field("session_id", &self.session_id)
            .field("transport", &self.transport)
            .finish()
    }
}
