//! JSON request/response messages exchanged with an environment server.
//!
//! The protocol is a plain command-response exchange:
//!
//! 1. Client sends a [`Request`]
//! 2. Server processes it and replies with exactly one [`Response`]
//!
//! Operation names and argument order (session id first) are the contract
//! between the remote proxy and the session registry on the far side.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::env::{CallArgs, EnvError, Signature};
use crate::error::Error;

/// Largest accepted frame payload.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A request from a client to an environment server.
///
/// ```
/// use envhub::transport::protocol::Request;
///
/// let json = r#"{"type":"call","api_name":"/step","data":["id","jump"]}"#;
/// let req: Request = serde_json::from_str(json).unwrap();
/// assert!(matches!(req, Request::Call { ref api_name, .. } if api_name == "/step"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Invoke a named operation.
    Call {
        api_name: String,
        /// Positional arguments.
        #[serde(default)]
        data: Vec<Value>,
        /// Keyword arguments.
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        kwargs: Map<String, Value>,
    },
    /// List the signatures of every exported operation.
    Info,
}

impl Request {
    pub fn call(api_name: impl Into<String>, args: CallArgs) -> Self {
        Self::Call {
            api_name: api_name.into(),
            data: args.positional,
            kwargs: args.named,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Successful call.
    Result { data: Value },
    /// Answer to [`Request::Info`].
    Info { operations: Vec<Signature> },
    /// Failed call.
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn from_result(result: Result<Value, Error>) -> Self {
        match result {
            Ok(data) => Self::Result { data },
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn from_error(err: &Error) -> Self {
        let (code, message) = ErrorCode::encode(err);
        Self::Error { code, message }
    }
}

/// Error category carried across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSession,
    Construction,
    Environment,
    InvalidArguments,
    UnknownOperation,
    Internal,
}

impl ErrorCode {
    /// Splits an error into its category and the payload needed to rebuild
    /// it on the other side.
    pub fn encode(err: &Error) -> (Self, String) {
        match err {
            Error::InvalidSession(id) => (Self::InvalidSession, id.clone()),
            Error::Construction(e) => (Self::Construction, e.to_string()),
            Error::Environment(e) => (Self::Environment, e.to_string()),
            Error::InvalidArguments(m) => (Self::InvalidArguments, m.clone()),
            Error::UnknownOperation(name) => (Self::UnknownOperation, name.clone()),
            other => (Self::Internal, other.to_string()),
        }
    }

    pub fn decode(self, message: String) -> Error {
        match self {
            Self::InvalidSession => Error::InvalidSession(message),
            Self::Construction => Error::Construction(EnvError::msg(message)),
            Self::Environment => Error::Environment(EnvError::msg(message)),
            Self::InvalidArguments => Error::InvalidArguments(message),
            Self::UnknownOperation => Error::UnknownOperation(message),
            Self::Internal => Error::Internal(message),
        }
    }
}
