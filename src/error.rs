use thiserror::Error;

use crate::env::EnvError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid session_id: {0}")]
    InvalidSession(String),

    #[error("environment construction failed: {0}")]
    Construction(#[source] EnvError),

    #[error("environment error: {0}")]
    Environment(#[from] EnvError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("operation already registered: {0}")]
    DuplicateOperation(String),

    #[error("invalid endpoint id: {0}")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout")]
    Timeout,

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures raised by the environment itself rather than by the
    /// multiplexing or transport layers.
    pub fn is_environment(&self) -> bool {
        matches!(self, Error::Environment(_) | Error::Construction(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Error::Timeout
    }
}
