use thiserror::Error;

/// Failure raised from inside an environment's `reset` or `step`.
///
/// The multiplexing layer never inspects or rewraps these; they reach the
/// caller (locally or across the wire) with their message intact.
#[derive(Error, Debug)]
pub enum EnvError {
    #[error("{0}")]
    Failed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl EnvError {
    pub fn msg(message: impl Into<String>) -> Self {
        EnvError::Failed(message.into().into())
    }
}
