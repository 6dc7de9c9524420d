//! Data sources and access paths
//!
//! The planner sees a collection only through these traits:
//!
//! - [`DataSourceManager`] resolves a collection by name
//! - [`DataSource`] reports row counts and statistics, lists access paths
//!   and fetches documents by id
//! - [`AccessPath`] is one way of reading a collection: everything, or
//!   through a single-key index
//!
//! Scans emit rows shaped as `{"meta": {"id": ...}}`. Paths that return
//! every document also attach the body under `"doc"`.

mod cancel;
mod errors;
mod memory;
mod range;

pub use cancel::{cancelled, recv_unless_cancelled, send_unless_cancelled, CancelHandle};
pub use errors::{DataSourceError, DataSourceErrorCode, DataSourceResult};
pub use memory::{load_documents, MemoryDataSource, MemoryDataSourceManager};
pub use range::{Boundary, DocIdBoundary, ViewLocation, ViewRange};

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{mpsc, watch};

use crate::ast::BooleanExpression;
use crate::stats::PathStatsMap;
use crate::value::Value;

/// Default number of index entries read per batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How a scan should read
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Index ranges to read; empty reads everything
    pub ranges: Vec<ViewRange>,
    pub batch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// One way of reading a collection
pub trait AccessPath: Send + Sync {
    fn name(&self) -> &str;

    /// Index keys in order; empty for a full scan
    fn keys(&self) -> &[String];

    /// True when a scan yields every document with its body
    fn returns_all(&self) -> bool;

    /// Whether some factor constrains only the leading index key. `Or`
    /// factors are never considered.
    fn matches(&self, factors: &[BooleanExpression]) -> bool {
        let Some(leading) = self.keys().first() else {
            return false;
        };
        factors
            .iter()
            .filter(|factor| !matches!(factor, BooleanExpression::Or(_)))
            .any(|factor| {
                let properties = factor.referenced_properties();
                properties.len() == 1 && &properties[0] == leading
            })
    }

    /// Streams rows into `output` until done, cancelled, or the receiver
    /// goes away. Dropping `output` on return closes the stream.
    fn scan(
        &self,
        output: mpsc::Sender<Value>,
        cancel: watch::Receiver<bool>,
        options: ScanOptions,
    ) -> BoxFuture<'static, DataSourceResult<()>>;

    /// Rebuilds this path's statistics and publishes them
    fn update_stats(&self) -> BoxFuture<'_, DataSourceResult<()>>;
}

pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    fn rows(&self) -> i64;

    /// Current statistics snapshot keyed by property path
    fn path_stats(&self) -> Arc<PathStatsMap>;

    /// Access paths in a stable order, full scan first
    fn access_paths(&self) -> Vec<Arc<dyn AccessPath>>;

    /// Document body by id
    fn fetch<'a>(&'a self, id: &'a str) -> BoxFuture<'a, DataSourceResult<Value>>;
}

pub trait DataSourceManager: Send + Sync {
    fn get_data_source(&self, name: &str) -> DataSourceResult<Arc<dyn DataSource>>;

    fn data_source_names(&self) -> Vec<String>;
}
