mod errors;
pub mod params;
pub mod schema;
mod traits;

pub use errors::EnvError;
pub use params::{Binder, CallArgs, Params};
pub use schema::{ParamSpec, Signature};
pub use traits::Environment;
