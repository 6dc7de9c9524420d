//! Query execution
//!
//! # Execution Flow
//!
//! 1. Plan the statement: one candidate per usable access path
//! 2. Choose the cheapest candidate
//! 3. Spawn the operator tree; every stage runs as its own task
//! 4. Stream rows to the caller as the root emits them
//!
//! Dropping the consumer, or calling [`RunningQuery::cancel`], stops the
//! scans at the bottom of the tree. Everything above them drains and exits.

mod engine;
mod errors;
mod writer;

pub use engine::{QueryEngine, RunningQuery};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult};
pub use writer::stream_results;
