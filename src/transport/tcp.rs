use std::fmt;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::env::{CallArgs, Signature};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::transport::framing::{read_message, write_message};
use crate::transport::protocol::{Request, Response};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    /// Upper bound on one request/response exchange; `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// Opens a transport to a resolved address.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport + 'static;

    async fn connect(&self, addr: &str) -> Result<Self::Transport>;
}

#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    pub config: ClientConfig,
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn connect(&self, addr: &str) -> Result<TcpTransport> {
        TcpTransport::connect_with(addr, self.config.clone()).await
    }
}

/// One long-lived connection to an environment server.
///
/// Exchanges are serialized over the connection. A connection that fails
/// mid-exchange is dropped and reopened on the next call, so a transport
/// error leaves the transport usable.
pub struct TcpTransport {
    peer: String,
    config: ClientConfig,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpTransport {
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with(addr, ClientConfig::default()).await
    }

    pub async fn connect_with(addr: &str, config: ClientConfig) -> Result<Self> {
        let stream = open(addr, &config).await?;
        info!(peer = addr, "connected to environment server");
        Ok(Self {
            peer: addr.to_string(),
            config,
            stream: Mutex::new(Some(stream)),
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    async fn round_trip(&self, request: &Request) -> Result<Response> {
        let mut slot = self.stream.lock().await;
        let mut stream = match slot.take() {
            Some(stream) if still_open(&stream) => stream,
            _ => {
                debug!(peer = %self.peer, "reopening connection");
                open(&self.peer, &self.config).await?
            }
        };

        let pending = exchange(&mut stream, request);
        let result = match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .unwrap_or(Err(Error::Timeout)),
            None => pending.await,
        };

        // A failed exchange may leave a half-read frame behind.
        if result.is_ok() {
            *slot = Some(stream);
        }
        result
    }
}

async fn open(addr: &str, config: &ClientConfig) -> Result<TcpStream> {
    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await?
        .map_err(|e| Error::Transport(format!("cannot connect to {addr}: {e}")))?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// An idle connection has nothing to read. EOF means the server closed it;
/// stray bytes mean it is out of sync. Either way it cannot be reused.
fn still_open(stream: &TcpStream) -> bool {
    let mut buf = [0u8; 1];
    matches!(stream.try_read(&mut buf), Err(e) if e.kind() == io::ErrorKind::WouldBlock)
}

async fn exchange(stream: &mut TcpStream, request: &Request) -> Result<Response> {
    write_message(&mut *stream, request).await?;
    read_message(&mut *stream)
        .await?
        .ok_or_else(|| Error::Transport("connection closed by server".to_string()))
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, api_name: &str, args: CallArgs) -> Result<Value> {
        debug!(peer = %self.peer, api_name, "remote call");
        match self.round_trip(&Request::call(api_name, args)).await? {
            Response::Result { data } => Ok(data),
            Response::Error { code, message } => Err(code.decode(message)),
            Response::Info { .. } => Err(Error::Transport(
                "unexpected info response to a call".to_string(),
            )),
        }
    }

    async fn describe(&self) -> Result<Vec<Signature>> {
        match self.round_trip(&Request::Info).await? {
            Response::Info { operations } => Ok(operations),
            Response::Error { code, message } => Err(code.decode(message)),
            Response::Result { .. } => Err(Error::Transport(
                "unexpected call result to an info request".to_string(),
            )),
        }
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("peer", &self.peer)
            .field("config", &self.config)
            .finish()
    }
}
