//! Operator capability and cost constants
//!
//! A plan is a chain of boxed operators, each owning its source. Every
//! operator owns one bounded output channel. `run` consumes the operator:
//! it starts its source on a new task, transforms rows from the source's
//! channel into its own, and drops its sender on return so the stream
//! closes exactly once on every exit path.

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use crate::datasource::CancelHandle;
use crate::value::Value;

/// Cost of one batched read against the store
pub const NETWORK_COST: f64 = 10000.0;
/// Cost of evaluating one row
pub const CPU_COST: f64 = 1.0;
/// Rows per batched read assumed by the cost model
pub const BATCH_SIZE: f64 = 1000.0;

/// Default buffered rows per operator channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub trait Operator: Send {
    fn name(&self) -> &'static str;

    /// Upstream operator, `None` for scans
    fn source(&self) -> Option<&dyn Operator>;

    /// Hands out the receiving side of this operator's output. Returns
    /// `None` once taken.
    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>>;

    /// Drives this operator, and transitively its sources, to completion
    fn run(self: Box<Self>) -> BoxFuture<'static, ()>;

    /// Asks this operator to stop producing. Only scans react; the rest of
    /// the pipeline observes end of stream.
    fn cancel(&self) {
        if let Some(handle) = self.cancel_handle() {
            handle.cancel();
        }
    }

    /// Cancellation handle owned by this operator, if it has one
    fn cancel_handle(&self) -> Option<CancelHandle> {
        None
    }

    /// Nested description of this operator and its sources
    fn explain(&self) -> serde_json::Value;

    /// Incremental cost of this operator alone
    fn cost(&self) -> f64;

    fn estimated_rows(&self) -> i64;

    /// Cost of this operator plus everything below it
    fn total_cost(&self) -> f64 {
        self.cost() + self.source().map_or(0.0, |source| source.total_cost())
    }
}

pub(crate) fn output_channel(capacity: usize) -> (mpsc::Sender<Value>, mpsc::Receiver<Value>) {
    mpsc::channel(capacity.max(1))
}

/// Takes `source`'s output and starts it on its own task
pub(crate) fn start_source(mut source: Box<dyn Operator>) -> Option<mpsc::Receiver<Value>> {
    let input = source.take_output()?;
    tokio::spawn(source.run());
    Some(input)
}

/// Explain document shared by every operator: type, estimates, detail
/// fields, then the nested source
pub(crate) fn explain_node(
    operator: &dyn Operator,
    kind: &str,
    detail: Map<String, serde_json::Value>,
) -> serde_json::Value {
    let mut node = Map::new();
    node.insert("type".into(), json!(kind));
    node.insert("estimated_rows".into(), json!(operator.estimated_rows()));
    node.insert("cost".into(), json!(operator.cost()));
    node.extend(detail);
    if let Some(source) = operator.source() {
        node.insert("source".into(), source.explain());
    }
    serde_json::Value::Object(node)
}

/// Cancel handles of every operator in the chain, top down
pub fn cancel_handles(operator: &dyn Operator) -> Vec<CancelHandle> {
    let mut handles = Vec::new();
    let mut current = Some(operator);
    while let Some(op) = current {
        if let Some(handle) = op.cancel_handle() {
            handles.push(handle);
        }
        current = op.source();
    }
    handles
}

/// Operator names from the top of the chain down to the scan
pub fn chain_names(operator: &dyn Operator) -> Vec<&'static str> {
    let mut names = Vec::new();
    let mut current = Some(operator);
    while let Some(op) = current {
        names.push(op.name());
        current = op.source();
    }
    names
}

/// Pretty-printed explain document
pub fn describe(operator: &dyn Operator) -> String {
    serde_json::to_string_pretty(&operator.explain())
        .unwrap_or_else(|e| format!("error serializing plan: {}", e))
}
