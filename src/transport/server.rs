//! TCP server exposing a [`Router`] over the framed JSON protocol.
//!
//! Each accepted connection gets its own task. Requests on one connection
//! are answered in order; separate connections proceed independently.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::api::Router;
use crate::env::CallArgs;
use crate::error::{Error, Result};
use crate::transport::DEFAULT_PORT;
use crate::transport::framing::{read_message, write_message};
use crate::transport::protocol::{Request, Response};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `"127.0.0.1:7860"`.
    pub bind_addr: String,
    /// Close connections that send nothing for this long.
    pub connection_idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            connection_idle_timeout: None,
        }
    }
}

pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(router: Arc<Router>, config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self {
            listener,
            router,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the process exits.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown` resolves. Connections already accepted keep
    /// running to completion.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            addr = %self.local_addr()?,
            operations = ?self.router.names().collect::<Vec<_>>(),
            "environment server listening"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("environment server shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        let router = Arc::clone(&self.router);
                        let idle = self.config.connection_idle_timeout;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, router, idle).await {
                                warn!(%peer, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    router: Arc<Router>,
    idle: Option<Duration>,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let next = match idle {
            Some(limit) => match tokio::time::timeout(limit, read_message(&mut reader)).await {
                Ok(read) => read,
                Err(_) => {
                    debug!("closing idle connection");
                    break;
                }
            },
            None => read_message(&mut reader).await,
        };
        let request = match next {
            Ok(Some(request)) => request,
            Ok(None) => break, // Client disconnected
            // The whole frame was consumed, so the stream is still in sync.
            Err(err @ Error::Deserialize(_)) => {
                debug!(error = %err, "rejecting malformed request");
                write_message(&mut writer, &Response::from_error(&err)).await?;
                continue;
            }
            Err(err) => return Err(err),
        };

        let response = dispatch(&router, request).await;
        write_message(&mut writer, &response).await?;
    }
    Ok(())
}

async fn dispatch(router: &Router, request: Request) -> Response {
    match request {
        Request::Call {
            api_name,
            data,
            kwargs,
        } => {
            let args = CallArgs {
                positional: data,
                named: kwargs,
            };
            Response::from_result(router.call(&api_name, args).await)
        }
        Request::Info => Response::Info {
            operations: router.describe(),
        },
    }
}
