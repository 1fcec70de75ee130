mod bound;
mod operation;

pub use bound::{EnvMethod, Reset, SessionBound, Step};
pub use operation::{Operation, OperationSink};
