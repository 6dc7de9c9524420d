//! aeroquery - a cost-based, streaming query engine for document collections
//!
//! A statement is planned once per usable access path, the cheapest
//! candidate is chosen by estimated cost, and the chosen operator tree runs
//! as a pipeline of tasks connected by bounded channels.

pub mod ast;
pub mod cli;
pub mod config;
pub mod datasource;
pub mod executor;
pub mod http_server;
pub mod observability;
pub mod plan;
pub mod stats;
pub mod value;
