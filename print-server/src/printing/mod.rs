//! Printing pipeline
//!
//! Raw request bodies are normalized into commands, queued, and later run
//! by a dispatcher through the interpreter engine against a backend.

pub mod dispatcher;
pub mod engine;
pub mod normalizer;
pub mod script;

pub use dispatcher::{DispatchWorker, dispatch_next, process_job};
pub use engine::{ExecutionResult, InterpreterEngine};
pub use normalizer::{EMPTY_REQUEST_TEXT, Normalizer, RejectionReason};
pub use script::{Program, ScriptError, ScriptValidationError, validate};
