//! # HTTP Server Module
//!
//! JSON-AST query front end.
//!
//! # Endpoints
//!
//! - `/api` - Welcome document
//! - `/api/:bucket/_query_ast` - Run a statement against a collection
//! - `/api/:bucket/_explain_ast` - Candidate plans for a statement

pub mod config;
pub mod errors;
pub mod query_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ErrorResponse, RestError, RestResult};
pub use query_routes::{query_routes, QueryState};
pub use server::HttpServer;
