//! Project operator
//!
//! Replaces each row with the value of the projection expression. Rows the
//! expression cannot be evaluated on are dropped. Without an expression
//! rows pass through unchanged.

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, start_source, Operator};
use crate::ast::{Context, Expression};
use crate::observability::{Event, Logger};
use crate::value::Value;

pub struct Project {
    source: Box<dyn Operator>,
    projection: Option<Expression>,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Project {
    pub fn new(source: Box<dyn Operator>, projection: Option<Expression>, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            projection,
            output,
            receiver: Some(receiver),
        }
    }
}

fn project(projection: &Expression, row: &Value) -> Option<Value> {
    if row.as_object().is_none() {
        Logger::warn(
            Event::ProjectionFailed,
            &[("error", "row is not an object"), ("kind", row.kind().as_str())],
        );
        return None;
    }
    match projection.evaluate(&Context::new(row)) {
        Ok(value) => Some(value),
        Err(err) => {
            Logger::trace(
                Event::ProjectionFailed,
                &[("error", &err.to_string()), ("expression", &projection.to_string())],
            );
            None
        }
    }
}

impl Operator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Project {
            source,
            projection,
            output,
            ..
        } = *self;
        Box::pin(async move {
            let Some(mut input) = start_source(source) else {
                return;
            };
            while let Some(row) = input.recv().await {
                let row = match &projection {
                    Some(expression) => match project(expression, &row) {
                        Some(value) => value,
                        None => continue,
                    },
                    None => row,
                };
                if output.send(row).await.is_err() {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        let expression = self.projection.as_ref().map(ToString::to_string);
        detail.insert("expression".into(), json!(expression));
        explain_node(self, "projection", detail)
    }

    fn cost(&self) -> f64 {
        0.0
    }

    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}
