//! Limit and Offset operators
//!
//! Counting pass-throughs. Limit stops reading as soon as its quota is
//! met and drops its input, which ends the upstream stages on their next
//! send.

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, start_source, Operator};
use crate::value::Value;

pub struct Limit {
    source: Box<dyn Operator>,
    limit: i64,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Limit {
    pub fn new(source: Box<dyn Operator>, limit: i64, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            limit,
            output,
            receiver: Some(receiver),
        }
    }
}

impl Operator for Limit {
    fn name(&self) -> &'static str {
        "limit"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Limit {
            source,
            limit,
            output,
            ..
        } = *self;
        Box::pin(async move {
            if limit <= 0 {
                return;
            }
            let Some(mut input) = start_source(source) else {
                return;
            };
            let mut count = 0;
            while let Some(row) = input.recv().await {
                if output.send(row).await.is_err() {
                    return;
                }
                count += 1;
                if count >= limit {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        detail.insert("amount".into(), json!(self.limit));
        explain_node(self, "limit", detail)
    }

    fn cost(&self) -> f64 {
        0.0
    }

    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}

pub struct Offset {
    source: Box<dyn Operator>,
    offset: i64,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Offset {
    pub fn new(source: Box<dyn Operator>, offset: i64, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            offset,
            output,
            receiver: Some(receiver),
        }
    }
}

impl Operator for Offset {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Offset {
            source,
            offset,
            output,
            ..
        } = *self;
        Box::pin(async move {
            let Some(mut input) = start_source(source) else {
                return;
            };
            let mut seen = 0;
            while let Some(row) = input.recv().await {
                seen += 1;
                if seen <= offset {
                    continue;
                }
                if output.send(row).await.is_err() {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        detail.insert("amount".into(), json!(self.offset));
        explain_node(self, "offset", detail)
    }

    fn cost(&self) -> f64 {
        0.0
    }

    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}
