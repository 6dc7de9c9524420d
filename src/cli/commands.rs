//! CLI command implementations
//!
//! `serve` runs until interrupted. `query` and `explain` read one request
//! from stdin, write one JSON document to stdout and exit; they only log
//! errors so stdout carries nothing but the result.

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::{mpsc, watch};

use crate::ast::Statement;
use crate::config::Config;
use crate::datasource::{MemoryDataSource, MemoryDataSourceManager};
use crate::executor::{stream_results, QueryEngine};
use crate::http_server::HttpServer;
use crate::observability::{Event, Logger, Severity};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_json};

/// Chunks buffered between the result writer and stdout
const OUTPUT_CHUNKS: usize = 64;

/// Dispatch a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config } => serve(&config),
        Command::Query { config, bucket } => query(&config, &bucket),
        Command::Explain { config, bucket } => explain(&config, &bucket),
    }
}

/// Load collections and serve HTTP until Ctrl-C
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.min_severity());
    Logger::info(
        Event::ConfigLoaded,
        &[
            ("collections", &config.collections.len().to_string()),
            ("path", &config_path.display().to_string()),
        ],
    );

    let manager = Arc::new(open_collections(&config)?);
    let runtime = runtime()?;

    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let refresher = config
            .engine
            .stats_refresh_interval()
            .map(|interval| manager.spawn_stats_refresh(interval, shutdown_rx.clone()));

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown_tx.send_replace(true);
            }
        });

        let server = HttpServer::new(
            config.server.clone(),
            manager.clone(),
            config.engine.planner_options(),
        );
        server.start(shutdown_rx).await?;

        if let Some(refresher) = refresher {
            let _ = refresher.await;
        }
        Ok::<(), CliError>(())
    })
}

/// Run one request from stdin, streaming the result envelope to stdout
pub fn query(config_path: &Path, bucket: &str) -> CliResult<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_query(config_path, bucket, stdin.lock(), &mut stdout)?;
    Ok(())
}

/// Print every candidate plan for one request from stdin
pub fn explain(config_path: &Path, bucket: &str) -> CliResult<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_explain(config_path, bucket, stdin.lock(), &mut stdout)
}

/// `query` against arbitrary streams. Returns the number of rows written.
pub fn run_query<R: Read, W: Write>(
    config_path: &Path,
    bucket: &str,
    input: R,
    out: &mut W,
) -> CliResult<u64> {
    let (engine, statement) = prepare(config_path, bucket, input)?;
    runtime()?.block_on(execute(&engine, &statement, out))
}

/// `explain` against arbitrary streams
pub fn run_explain<R: Read, W: Write>(
    config_path: &Path,
    bucket: &str,
    input: R,
    out: &mut W,
) -> CliResult<()> {
    let (engine, statement) = prepare(config_path, bucket, input)?;
    let explain = engine.explain(&statement)?;
    write_json(out, &explain.to_json())
}

fn prepare<R: Read>(config_path: &Path, bucket: &str, input: R) -> CliResult<(QueryEngine, Statement)> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.min_severity().max(Severity::Error));

    let request = read_request(input)?;
    let statement = Statement::from_json_request(bucket, &request)?;

    let manager = open_collections(&config)?;
    let engine = QueryEngine::new(Arc::new(manager), config.engine.planner_options());
    Ok((engine, statement))
}

async fn execute<W: Write>(engine: &QueryEngine, statement: &Statement, out: &mut W) -> CliResult<u64> {
    let query = engine.start(statement)?;
    let (tx, mut rx) = mpsc::channel::<String>(OUTPUT_CHUNKS);
    let writer = tokio::spawn(stream_results(query, tx));

    while let Some(chunk) = rx.recv().await {
        out.write_all(chunk.as_bytes())?;
    }
    writeln!(out)?;
    out.flush()?;

    let total = writer
        .await
        .map_err(|e| CliError::query_failed(format!("result writer panicked: {}", e)))??;
    Ok(total)
}

fn open_collections(config: &Config) -> CliResult<MemoryDataSourceManager> {
    let mut manager = MemoryDataSourceManager::new();
    for collection in &config.collections {
        let source =
            MemoryDataSource::load(&collection.name, &collection.documents, &collection.indexes)?;
        manager.add(source);
    }
    Ok(manager)
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new().map_err(|e| CliError::io_error(format!("failed to start runtime: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let docs = json!([
            {"id": "ipa", "abv": 6.5, "style": "ale"},
            {"id": "stout", "abv": 8.0, "style": "ale"},
            {"id": "pils", "abv": 4.8, "style": "lager"}
        ]);
        fs::write(dir.path().join("beers.json"), docs.to_string()).unwrap();
        let config = json!({
            "log_level": "error",
            "collections": [{"name": "beers", "documents": "beers.json", "indexes": ["doc.abv"]}]
        });
        fs::write(dir.path().join("aeroquery.json"), config.to_string()).unwrap();
        dir
    }

    fn request() -> String {
        request_where(json!({
            "type": "compare",
            "operator": "eq",
            "left": {"type": "property", "path": "doc.style"},
            "right": {"type": "literal", "value": "ale"}
        }))
    }

    fn request_where(predicate: serde_json::Value) -> String {
        json!({
            "type": "cbqast",
            "version": "1",
            "statement": {
                "type": "select",
                "where": predicate,
                "select": {"type": "property", "path": "doc.abv"},
                "order": [{"expr": {"type": "property", "path": "doc.abv"}, "ascending": false}]
            }
        })
        .to_string()
    }

    #[test]
    fn test_run_query() {
        let dir = fixture();
        let mut out = Vec::new();
        let total = run_query(
            &dir.path().join("aeroquery.json"),
            "beers",
            request().as_bytes(),
            &mut out,
        )
        .unwrap();

        assert_eq!(total, 2);
        let body: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(body, json!({"resultset": [8, 6.5], "total_rows": 2}));
    }

    fn explain_candidates(request: String) -> usize {
        let dir = fixture();
        let mut out = Vec::new();
        run_explain(
            &dir.path().join("aeroquery.json"),
            "beers",
            request.as_bytes(),
            &mut out,
        )
        .unwrap();

        let body: serde_json::Value = serde_json::from_slice(&out).unwrap();
        body["candidates"].as_array().unwrap().len()
    }

    #[test]
    fn test_run_explain() {
        let strong = request_where(json!({
            "type": "compare",
            "operator": "gt",
            "left": {"type": "property", "path": "doc.abv"},
            "right": {"type": "literal", "value": 5}
        }));
        assert_eq!(explain_candidates(strong), 2);
    }

    #[test]
    fn test_run_explain_without_usable_index() {
        assert_eq!(explain_candidates(request()), 1);
    }

    #[test]
    fn test_unknown_bucket() {
        let dir = fixture();
        let err = run_query(
            &dir.path().join("aeroquery.json"),
            "wines",
            request().as_bytes(),
            &mut Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_QUERY_FAILED");
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_query(
            &dir.path().join("missing.json"),
            "beers",
            request().as_bytes(),
            &mut Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_CONFIG_ERROR");
    }
}
