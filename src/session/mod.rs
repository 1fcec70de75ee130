mod id;
mod registry;

pub use id::SessionId;
pub use registry::{RegistryConfig, SessionHandle, SessionRegistry};
