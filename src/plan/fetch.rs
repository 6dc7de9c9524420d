//! Fetch operator
//!
//! Attaches document bodies to rows that arrived as id stubs. A document
//! that cannot be fetched is logged and skipped; the query continues.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Map;
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, start_source, Operator, NETWORK_COST};
use crate::datasource::DataSource;
use crate::observability::{Event, Logger};
use crate::value::Value;

/// Index-provided metadata that may be stale once the body is fetched
const STALE_META: [&str; 3] = ["rev", "flags", "expiration"];

pub struct Fetch {
    source: Box<dyn Operator>,
    data_source: Arc<dyn DataSource>,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Fetch {
    pub fn new(source: Box<dyn Operator>, data_source: Arc<dyn DataSource>, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            data_source,
            output,
            receiver: Some(receiver),
        }
    }
}

/// Id of a stub row, `None` if the row has no string `meta.id`
fn row_id(row: &Value) -> Option<String> {
    row.get("meta")?.get("id")?.as_str().map(str::to_string)
}

async fn fetch_body(data_source: &dyn DataSource, mut row: Value) -> Option<Value> {
    let Some(id) = row_id(&row) else {
        Logger::warn(
            Event::FetchFailed,
            &[("error", "row has no document id"), ("row", &row.to_string())],
        );
        return None;
    };

    let doc = match data_source.fetch(&id).await {
        Ok(doc) => doc,
        Err(err) => {
            Logger::warn(
                Event::FetchFailed,
                &[("error", &err.to_string()), ("id", &id)],
            );
            return None;
        }
    };

    let fields = row.as_object_mut()?;
    if let Some(meta) = fields.get_mut("meta").and_then(Value::as_object_mut) {
        for key in STALE_META {
            meta.remove(key);
        }
    }
    fields.insert("doc".to_string(), doc);
    Some(row)
}

impl Operator for Fetch {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Fetch {
            source,
            data_source,
            output,
            ..
        } = *self;
        Box::pin(async move {
            let Some(mut input) = start_source(source) else {
                return;
            };
            while let Some(row) = input.recv().await {
                let row = if row.get("doc").is_some() {
                    row
                } else {
                    match fetch_body(data_source.as_ref(), row).await {
                        Some(row) => row,
                        None => continue,
                    }
                };
                if output.send(row).await.is_err() {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        explain_node(self, "fetch", Map::new())
    }

    /// Point lookups over a kept connection are cheaper than index reads
    fn cost(&self) -> f64 {
        self.estimated_rows() as f64 + NETWORK_COST
    }

    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}
