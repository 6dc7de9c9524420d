//! Scripted operator for tests

use futures_util::future::BoxFuture;
use serde_json::Map;
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, Operator};
use crate::datasource::{send_unless_cancelled, CancelHandle};
use crate::value::Value;

/// Emits a fixed list of rows, with a fixed cost and row estimate
pub struct MockOperator {
    rows: Vec<Value>,
    cost: f64,
    estimated_rows: i64,
    cancel: CancelHandle,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl MockOperator {
    pub fn new(rows: Vec<Value>) -> Self {
        let estimated_rows = rows.len() as i64;
        let (output, receiver) = output_channel(4);
        Self {
            rows,
            cost: 0.0,
            estimated_rows,
            cancel: CancelHandle::new(),
            output,
            receiver: Some(receiver),
        }
    }

    pub fn with_cost(rows: Vec<Value>, cost: f64) -> Self {
        Self {
            cost,
            ..Self::new(rows)
        }
    }

    pub fn with_estimated_rows(mut self, estimated_rows: i64) -> Self {
        self.estimated_rows = estimated_rows;
        self
    }

    pub fn handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl Operator for MockOperator {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn source(&self) -> Option<&dyn Operator> {
        None
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let this = *self;
        Box::pin(async move {
            let mut cancel = this.cancel.subscribe();
            for row in this.rows {
                if !send_unless_cancelled(&this.output, &mut cancel, row).await {
                    return;
                }
            }
        })
    }

    fn cancel_handle(&self) -> Option<CancelHandle> {
        Some(self.cancel.clone())
    }

    fn explain(&self) -> serde_json::Value {
        explain_node(self, "mock", Map::new())
    }

    fn cost(&self) -> f64 {
        self.cost
    }

    fn estimated_rows(&self) -> i64 {
        self.estimated_rows
    }
}

/// Runs `operator` and collects everything it emits
pub async fn drain(mut operator: Box<dyn Operator>) -> Vec<Value> {
    let Some(mut output) = operator.take_output() else {
        return Vec::new();
    };
    tokio::spawn(operator.run());
    let mut rows = Vec::new();
    while let Some(row) = output.recv().await {
        rows.push(row);
    }
    rows
}

/// Row shaped like a fetched document
pub fn doc_row(id: &str, doc: serde_json::Value) -> Value {
    Value::object([
        ("meta", Value::object([("id", Value::from(id))])),
        ("doc", Value::from(doc)),
    ])
}
