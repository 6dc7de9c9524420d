//! Observability
//!
//! Structured JSON logging with typed events:
//!
//! ```ignore
//! use aeroquery::observability::{Event, Logger};
//!
//! Logger::info(Event::QueryComplete, &[("rows", "42")]);
//! ```
//!
//! Per-row failures (fetch misses, unresolvable paths) are logged at TRACE
//! or WARN and never abort a query.

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};
