//! Source operators
//!
//! [`AllDocsScan`] reads a full-scan access path. [`ViewScan`] reads a
//! single-key index narrowed to the ranges its sargable factors allow.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, Operator, BATCH_SIZE, NETWORK_COST};
use crate::ast::BooleanExpression;
use crate::datasource::{AccessPath, CancelHandle, ScanOptions, ViewRange};
use crate::observability::{Event, Logger};
use crate::stats::PathStatsMap;
use crate::value::Value;

fn scan_cost(rows: i64) -> f64 {
    rows as f64 / BATCH_SIZE * NETWORK_COST
}

async fn run_scan(
    path: Arc<dyn AccessPath>,
    output: mpsc::Sender<Value>,
    cancel: CancelHandle,
    options: ScanOptions,
) {
    if let Err(err) = path.scan(output, cancel.subscribe(), options).await {
        Logger::error(
            Event::ScanFailed,
            &[("access_path", path.name()), ("error", &err.to_string())],
        );
    }
}

/// Full scan over every document
pub struct AllDocsScan {
    path: Arc<dyn AccessPath>,
    rows: i64,
    batch_size: usize,
    cancel: CancelHandle,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl AllDocsScan {
    /// `rows` is the collection's row count
    pub fn new(path: Arc<dyn AccessPath>, rows: i64, batch_size: usize, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            path,
            rows,
            batch_size,
            cancel: CancelHandle::new(),
            output,
            receiver: Some(receiver),
        }
    }
}

impl Operator for AllDocsScan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn source(&self) -> Option<&dyn Operator> {
        None
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let this = *self;
        let options = ScanOptions {
            ranges: Vec::new(),
            batch_size: this.batch_size,
        };
        Box::pin(run_scan(this.path, this.output, this.cancel, options))
    }

    fn cancel_handle(&self) -> Option<CancelHandle> {
        Some(self.cancel.clone())
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        detail.insert("index".into(), json!(self.path.name()));
        explain_node(self, "scan", detail)
    }

    fn cost(&self) -> f64 {
        scan_cost(self.estimated_rows())
    }

    fn estimated_rows(&self) -> i64 {
        self.rows
    }
}

/// Range scan over a single-key index
pub struct ViewScan {
    path: Arc<dyn AccessPath>,
    rows: i64,
    stats: Arc<PathStatsMap>,
    supported_factors: Vec<BooleanExpression>,
    ranges: Vec<ViewRange>,
    batch_size: usize,
    cancel: CancelHandle,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl ViewScan {
    /// Starts with one range covering the whole index. `rows` is the
    /// collection's row count, used when the index has no statistics.
    pub fn new(
        path: Arc<dyn AccessPath>,
        rows: i64,
        stats: Arc<PathStatsMap>,
        batch_size: usize,
        capacity: usize,
    ) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            path,
            rows,
            stats,
            supported_factors: Vec::new(),
            ranges: vec![ViewRange::full()],
            batch_size,
            cancel: CancelHandle::new(),
            output,
            receiver: Some(receiver),
        }
    }

    /// Folds a sargable factor on the leading key into the scan ranges.
    /// Returns false, leaving the scan untouched, for any other factor.
    pub fn add_factor(&mut self, factor: &BooleanExpression) -> bool {
        let Some(comparison) = factor.as_comparison() else {
            return false;
        };
        let Some(leading) = self.path.keys().first() else {
            return false;
        };
        let (Some(property), Some(value), Some(operator)) = (
            comparison.sarg_property(),
            comparison.sarg_value(),
            comparison.sarg_operator(),
        ) else {
            return false;
        };
        if property != leading.as_str() {
            return false;
        }

        for range in ViewRange::for_comparison(operator, value) {
            Logger::trace(
                Event::RangeMerged,
                &[("access_path", self.path.name()), ("range", &range.to_string())],
            );
            ViewRange::merge_into(&mut self.ranges, range);
        }
        self.supported_factors.push(factor.clone());
        true
    }

    pub fn ranges(&self) -> &[ViewRange] {
        &self.ranges
    }

    /// Factors folded into the ranges so far
    pub fn supported_factors(&self) -> &[BooleanExpression] {
        &self.supported_factors
    }
}

impl Operator for ViewScan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn source(&self) -> Option<&dyn Operator> {
        None
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let this = *self;
        let options = ScanOptions {
            ranges: this.ranges,
            batch_size: this.batch_size,
        };
        Box::pin(run_scan(this.path, this.output, this.cancel, options))
    }

    fn cancel_handle(&self) -> Option<CancelHandle> {
        Some(self.cancel.clone())
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        detail.insert("index".into(), json!(self.path.name()));
        detail.insert(
            "ranges".into(),
            serde_json::Value::Array(self.ranges.iter().map(ViewRange::explain).collect()),
        );
        explain_node(self, "scan", detail)
    }

    fn cost(&self) -> f64 {
        scan_cost(self.estimated_rows())
    }

    /// Index rows scaled by the selectivity of every folded factor, or the
    /// collection's rows when the index has no statistics
    fn estimated_rows(&self) -> i64 {
        let Some(leading) = self.path.keys().first() else {
            return self.rows;
        };
        let Some(path_stats) = self.stats.get(leading) else {
            return self.rows;
        };
        let selectivity: f64 = self
            .supported_factors
            .iter()
            .map(|factor| factor.selectivity(&self.stats))
            .product();
        (path_stats.rows as f64 * selectivity) as i64
    }
}
