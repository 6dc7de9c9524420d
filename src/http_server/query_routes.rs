//! Query HTTP Routes
//!
//! - `GET  /api` welcome document
//! - `POST /api/:bucket/_query_ast` run a JSON-AST statement, streaming the result set
//! - `POST /api/:bucket/_explain_ast` candidate plans with their costs

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream;
use serde_json::{json, Value as JsonValue};
use tokio::sync::mpsc;

use super::errors::{RestError, RestResult};
use crate::ast::Statement;
use crate::datasource::DataSourceManager;
use crate::executor::{stream_results, QueryEngine};
use crate::observability::{Event, Logger};
use crate::plan::PlannerOptions;

/// Chunks buffered between the result writer and the socket
const RESPONSE_CHUNKS: usize = 64;

// ==================
// Shared State
// ==================

pub struct QueryState {
    pub data_sources: Arc<dyn DataSourceManager>,
    pub engine: QueryEngine,
}

impl QueryState {
    pub fn new(data_sources: Arc<dyn DataSourceManager>, options: PlannerOptions) -> Self {
        Self {
            engine: QueryEngine::new(Arc::clone(&data_sources), options),
            data_sources,
        }
    }

    /// Parses `body` as a statement over `bucket`. The bucket is resolved
    /// first so an unknown bucket is reported even when the body is bad.
    fn statement(&self, bucket: &str, body: &[u8]) -> RestResult<Statement> {
        self.data_sources.get_data_source(bucket)?;
        parse_statement(bucket, body)
    }
}

// ==================
// Router
// ==================

pub fn query_routes(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/:bucket/_query_ast", post(query_ast))
        .route("/:bucket/_explain_ast", post(explain_ast))
        .with_state(state)
}

// ==================
// Handlers
// ==================

async fn welcome() -> Json<JsonValue> {
    Json(json!({
        "aeroquery": "Welcome",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn query_ast(
    State(state): State<Arc<QueryState>>,
    Path(bucket): Path<String>,
    body: Bytes,
) -> RestResult<Response> {
    let statement = state.statement(&bucket, &body)?;
    let query = state.engine.start(&statement)?;

    let (tx, rx) = mpsc::channel::<String>(RESPONSE_CHUNKS);
    let query_id = query.id().to_string();
    tokio::spawn(async move {
        if let Err(err) = stream_results(query, tx).await {
            Logger::warn(
                Event::QueryFailed,
                &[("error", &err.to_string()), ("query_id", &query_id)],
            );
        }
    });

    let chunks = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    });

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(chunks),
    )
        .into_response())
}

async fn explain_ast(
    State(state): State<Arc<QueryState>>,
    Path(bucket): Path<String>,
    body: Bytes,
) -> RestResult<Json<JsonValue>> {
    let statement = state.statement(&bucket, &body)?;
    let explain = state.engine.explain(&statement)?;
    Ok(Json(explain.to_json()))
}

fn parse_statement(bucket: &str, body: &[u8]) -> RestResult<Statement> {
    let request: JsonValue =
        serde_json::from_slice(body).map_err(|e| RestError::InvalidBody(e.to_string()))?;
    Ok(Statement::from_json_request(bucket, &request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{MemoryDataSource, MemoryDataSourceManager};
    use crate::value::Value;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let docs = vec![
            ("a".to_string(), Value::from(json!({"name": "ipa", "abv": 6.5}))),
            ("b".to_string(), Value::from(json!({"name": "stout", "abv": 8.0}))),
            ("c".to_string(), Value::from(json!({"name": "lager", "abv": 4.2}))),
        ];
        let mut manager = MemoryDataSourceManager::new();
        manager.add(MemoryDataSource::new("beers", docs, &["doc.abv".to_string()]));
        let state = QueryState::new(Arc::new(manager), PlannerOptions::default());
        Router::new().nest("/api", query_routes(Arc::new(state)))
    }

    fn strong_beers() -> JsonValue {
        json!({
            "type": "cbqast",
            "version": "1",
            "statement": {
                "type": "select",
                "where": {
                    "type": "compare",
                    "operator": "gt",
                    "left": {"type": "property", "path": "doc.abv"},
                    "right": {"type": "literal", "value": 5}
                },
                "select": {"type": "property", "path": "doc.name"},
                "order": [{"expr": {"type": "property", "path": "doc.abv"}, "ascending": true}]
            }
        })
    }

    async fn post(uri: &str, body: String) -> (StatusCode, JsonValue) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_welcome() {
        let response = app()
            .oneshot(Request::get("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["aeroquery"], "Welcome");
    }

    #[tokio::test]
    async fn test_query_streams_resultset() {
        let (status, body) = post("/api/beers/_query_ast", strong_beers().to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"resultset": ["ipa", "stout"], "total_rows": 2}));
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_404() {
        let (status, body) = post("/api/wines/_query_ast", strong_beers().to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);
    }

    #[tokio::test]
    async fn test_bad_json_is_500() {
        let (status, body) = post("/api/beers/_query_ast", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn test_unknown_bucket_checked_before_body() {
        let (status, body) = post("/api/wines/_query_ast", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 404);

        let (status, _) = post("/api/wines/_explain_ast", "{not json".to_string()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_statement_is_500() {
        let request = json!({"type": "cbqast", "version": "2", "statement": {}});
        let (status, body) = post("/api/beers/_query_ast", request.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], 500);
    }

    #[tokio::test]
    async fn test_explain() {
        let (status, body) = post("/api/beers/_explain_ast", strong_beers().to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let candidates = body["candidates"].as_array().unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0]["plan"]["type"], "projection");
        assert!(body["chosen"].is_number());
    }
}
