//! Result set streaming
//!
//! Rows are written as they arrive, in the shape
//! `{"resultset":[row,row,...],"total_rows":N}`. Nothing is buffered beyond
//! the current row.

use tokio::sync::mpsc;

use super::engine::RunningQuery;
use super::errors::{ExecutorError, ExecutorResult};
use crate::observability::{Event, Logger};

const RESULTSET_OPEN: &str = "{\"resultset\":[";

/// Streams every row of `query` into `chunks`. Returns the row count.
///
/// If the receiving side goes away, the query is cancelled and an
/// `AERO_EXECUTION_CANCELLED` error is returned.
pub async fn stream_results(
    mut query: RunningQuery,
    chunks: mpsc::Sender<String>,
) -> ExecutorResult<u64> {
    let query_id = query.id().to_string();
    let mut written: u64 = 0;

    if chunks.send(RESULTSET_OPEN.to_string()).await.is_err() {
        return Err(abandon(&query, &query_id, written));
    }

    while let Some(row) = query.next().await {
        let json = match serde_json::to_string(&row) {
            Ok(json) => json,
            Err(err) => {
                Logger::warn(
                    Event::RowSerializationFailed,
                    &[("error", &err.to_string()), ("query_id", &query_id)],
                );
                continue;
            }
        };

        let chunk = if written == 0 { json } else { format!(",{}", json) };
        if chunks.send(chunk).await.is_err() {
            return Err(abandon(&query, &query_id, written));
        }
        written += 1;
    }

    let close = format!("],\"total_rows\":{}}}", written);
    if chunks.send(close).await.is_err() {
        return Err(abandon(&query, &query_id, written));
    }

    Logger::info(
        Event::QueryComplete,
        &[
            ("duration_ms", &query.elapsed_ms().to_string()),
            ("query_id", &query_id),
            ("total_rows", &written.to_string()),
        ],
    );
    Ok(written)
}

fn abandon(query: &RunningQuery, query_id: &str, written: u64) -> ExecutorError {
    query.cancel();
    Logger::warn(
        Event::QueryCancelled,
        &[("query_id", query_id), ("rows_written", &written.to_string())],
    );
    ExecutorError::cancelled(written)
}
