//! Dispatch file processor
//!
//! Extracts POD codes, registry classifications and typical-day curves from
//! uploaded dispatch files, one time-boxed chunk per invocation.

pub mod archive;
pub mod continuation;
pub mod deadline;
pub mod errors;
pub mod extract;
pub mod parsers;
pub mod processor;
pub mod scheduler;

pub use continuation::{merge_outcomes, Continuation, MergedOutcome};
pub use deadline::Deadline;
pub use errors::ProcessorError;
pub use processor::{
    DispatchProcessor, ProcessFileRequest, ProcessFileResponse, ProcessingSettings,
};
