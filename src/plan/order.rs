//! Order operator
//!
//! Blocking: collects every row from its source, sorts, then emits. Keys
//! are evaluated once per row. The sort is stable and compares key by key,
//! moving to the next key only on an exact tie. A key that fails to
//! evaluate sorts after every key that evaluates, in either direction.

use std::cmp::Ordering;

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, start_source, Operator};
use crate::ast::{Context, SortExpression};
use crate::observability::{Event, Logger};
use crate::value::{collate, Value};

pub struct Order {
    source: Box<dyn Operator>,
    order_by: Vec<SortExpression>,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Order {
    pub fn new(source: Box<dyn Operator>, order_by: Vec<SortExpression>, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            order_by,
            output,
            receiver: Some(receiver),
        }
    }
}

type SortKeys = Vec<Option<Value>>;

fn sort_keys(order_by: &[SortExpression], row: &Value) -> SortKeys {
    if row.as_object().is_none() {
        Logger::warn(
            Event::SortKeyFailed,
            &[("error", "row is not an object"), ("kind", row.kind().as_str())],
        );
        return vec![None; order_by.len()];
    }
    let context = Context::new(row);
    order_by
        .iter()
        .map(|key| match key.expr.evaluate(&context) {
            Ok(value) => Some(value),
            Err(err) => {
                Logger::trace(
                    Event::SortKeyFailed,
                    &[("error", &err.to_string()), ("key", &key.to_string())],
                );
                None
            }
        })
        .collect()
}

fn compare_keys(order_by: &[SortExpression], left: &SortKeys, right: &SortKeys) -> Ordering {
    for (i, key) in order_by.iter().enumerate() {
        let ordering = match (&left[i], &right[i]) {
            (Some(a), Some(b)) => {
                let ordering = collate(a, b);
                if key.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

impl Operator for Order {
    fn name(&self) -> &'static str {
        "order"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Order {
            source,
            order_by,
            output,
            ..
        } = *self;
        Box::pin(async move {
            let Some(mut input) = start_source(source) else {
                return;
            };

            let mut keyed = Vec::new();
            while let Some(row) = input.recv().await {
                keyed.push((sort_keys(&order_by, &row), row));
            }
            keyed.sort_by(|a, b| compare_keys(&order_by, &a.0, &b.0));

            for (_, row) in keyed {
                if output.send(row).await.is_err() {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        let by: Vec<String> = self.order_by.iter().map(ToString::to_string).collect();
        detail.insert("by".into(), json!(by));
        explain_node(self, "order", detail)
    }

    /// n log10 n over the source estimate
    fn cost(&self) -> f64 {
        let rows = self.source.estimated_rows() as f64;
        if rows <= 1.0 {
            return 0.0;
        }
        rows * rows.log10()
    }

    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}
