mod exporter;
mod router;

pub use exporter::{ApiExporter, Exported, Init, register_env};
pub use router::Router;

/// Operation names, fixed by the wire contract.
pub const INIT: &str = "init";
pub const RESET: &str = "reset";
pub const STEP: &str = "step";
