//! External template processor: invocation and diagnostic decoding.
//!
//! - Invocation with a hard deadline and forced termination
//! - Exit code classification
//! - Framed diagnostic records on standard error

pub mod decoder;
mod invoker;

pub use decoder::{DiagnosticDecoder, decode_all};
pub use invoker::{DEFAULT_TIMEOUT, ProcessInvoker, ProcessOutcome, ProcessRun};
