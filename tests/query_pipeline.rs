//! Query Pipeline Tests
//!
//! End-to-end behaviour through the public API:
//! - Plan shapes and candidate counts
//! - Index range merging
//! - Streaming results through the chosen plan
//! - Early termination under a limit

use std::sync::Arc;
use std::time::Duration;

use aeroquery::ast::{BooleanExpression, Expression, SelectStatement, SortExpression, Statement};
use aeroquery::datasource::{DataSourceManager, MemoryDataSource, MemoryDataSourceManager};
use aeroquery::executor::{stream_results, QueryEngine};
use aeroquery::plan::{chain_names, Planner, PlannerOptions, ViewScan};
use aeroquery::value::Value;
use serde_json::json;
use tokio::sync::mpsc;

// =============================================================================
// Helper Functions
// =============================================================================

fn numbers(name: &str, count: i64, indexes: &[&str]) -> Arc<MemoryDataSourceManager> {
    let docs = (0..count).map(|i| {
        let parity = if i % 2 == 0 { "even" } else { "odd" };
        (format!("n{:04}", i), Value::from(json!({"x": i, "parity": parity})))
    });
    let indexes: Vec<String> = indexes.iter().map(|s| s.to_string()).collect();
    let mut manager = MemoryDataSourceManager::new();
    manager.add(MemoryDataSource::new(name, docs, &indexes));
    Arc::new(manager)
}

fn x() -> Expression {
    Expression::property("doc.x")
}

fn num(n: f64) -> Expression {
    Expression::number(n)
}

fn select(statement: SelectStatement) -> Statement {
    Statement::Select(statement)
}

async fn run(engine: &QueryEngine, statement: &Statement) -> Vec<Value> {
    engine.start(statement).unwrap().collect().await
}

// =============================================================================
// Planning
// =============================================================================

/// Every optional layer is present, in order, over a full scan.
#[test]
fn test_full_scan_plan_shape() {
    let planner = Planner::new(numbers("n", 10, &[]));
    let statement = select(
        SelectStatement::new()
            .from("n")
            .filter(BooleanExpression::eq(Expression::property("x"), num(1.0)))
            .order_by(SortExpression::ascending(Expression::property("x")))
            .limit(5)
            .offset(2),
    );

    let plans = planner.plan(&statement).unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(
        chain_names(plans[0].as_ref()),
        vec!["project", "limit", "offset", "order", "filter", "fetch", "scan"]
    );
}

/// Disjoint factors on the index key leave two ranges, not an empty set.
#[test]
fn test_disjoint_factors_keep_two_ranges() {
    let manager = numbers("n", 10, &["doc.x"]);
    let source = manager.get_data_source("n").unwrap();
    let index = source
        .access_paths()
        .into_iter()
        .find(|path| !path.returns_all())
        .unwrap();

    let mut scan = ViewScan::new(index, source.rows(), source.path_stats(), 100, 16);
    assert!(scan.add_factor(&BooleanExpression::lt(x(), num(3.0))));
    assert!(scan.add_factor(&BooleanExpression::gt(x(), num(7.0))));

    let ranges: Vec<String> = scan.ranges().iter().map(|r| r.to_string()).collect();
    assert_eq!(ranges, vec!["[MIN, 3 MIN_DOC_ID]", "[7 MAX_DOC_ID, MAX]"]);
}

// =============================================================================
// Execution
// =============================================================================

/// Both candidate plans produce the same rows; the engine picks one.
#[tokio::test]
async fn test_index_and_full_scan_agree() {
    let manager = numbers("n", 200, &["doc.x"]);
    let statement = select(
        SelectStatement::new()
            .from("n")
            .filter(BooleanExpression::and(vec![
                BooleanExpression::gte(x(), num(10.0)),
                BooleanExpression::lt(x(), num(20.0)),
            ]))
            .order_by(SortExpression::ascending(x()))
            .select(x()),
    );

    let planner = Planner::new(manager.clone());
    let plans = planner.plan(&statement).unwrap();
    assert_eq!(plans.len(), 2);

    let engine = QueryEngine::new(manager, PlannerOptions::default());
    let expected: Vec<Value> = (10..20).map(|i| Value::from(i as i64)).collect();
    assert_eq!(run(&engine, &statement).await, expected);
}

/// Offset skips before limit counts.
#[tokio::test]
async fn test_order_offset_limit() {
    let engine = QueryEngine::new(numbers("n", 50, &[]), PlannerOptions::default());
    let statement = select(
        SelectStatement::new()
            .from("n")
            .filter(BooleanExpression::eq(
                Expression::property("doc.parity"),
                Expression::string("odd"),
            ))
            .order_by(SortExpression::descending(x()))
            .limit(3)
            .offset(2)
            .select(x()),
    );

    let rows = run(&engine, &statement).await;
    assert_eq!(
        rows,
        vec![Value::from(45i64), Value::from(43i64), Value::from(41i64)]
    );
}

/// A limit smaller than the collection ends the stream early.
#[tokio::test]
async fn test_limit_stops_the_pipeline() {
    let options = PlannerOptions {
        channel_capacity: 2,
        batch_size: 10,
    };
    let engine = QueryEngine::new(numbers("n", 1000, &[]), options);
    let statement = select(SelectStatement::new().from("n").limit(4).select(x()));

    let rows = tokio::time::timeout(Duration::from_secs(5), run(&engine, &statement))
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);
}

/// Rows whose filter path cannot be resolved are dropped, not fatal.
#[tokio::test]
async fn test_unresolvable_paths_are_dropped() {
    let docs = vec![
        ("a".to_string(), Value::from(json!({"address": {"city": "Paris"}}))),
        ("b".to_string(), Value::from(json!({"address": "unknown"}))),
        ("c".to_string(), Value::from(json!({"address": {"city": "Oslo"}}))),
    ];
    let mut manager = MemoryDataSourceManager::new();
    manager.add(MemoryDataSource::new("people", docs, &[]));
    let engine = QueryEngine::new(Arc::new(manager), PlannerOptions::default());

    let statement = select(
        SelectStatement::new()
            .from("people")
            .filter(BooleanExpression::neq(
                Expression::property("doc.address.city"),
                Expression::string("Paris"),
            ))
            .select(Expression::property("meta.id")),
    );
    assert_eq!(run(&engine, &statement).await, vec![Value::from("c")]);
}

/// The response envelope counts exactly the rows written.
#[tokio::test]
async fn test_response_envelope() {
    let engine = QueryEngine::new(numbers("n", 5, &[]), PlannerOptions::default());
    let statement = select(SelectStatement::new().from("n").select(x()));

    let (tx, mut rx) = mpsc::channel(8);
    let writer = tokio::spawn(stream_results(engine.start(&statement).unwrap(), tx));

    let mut body = String::new();
    while let Some(chunk) = rx.recv().await {
        body.push_str(&chunk);
    }
    assert_eq!(writer.await.unwrap().unwrap(), 5);

    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed, json!({"resultset": [0, 1, 2, 3, 4], "total_rows": 5}));
}
