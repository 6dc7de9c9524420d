//! Query engine
//!
//! Plans a statement, lets the optimizer choose, then starts the chosen
//! operator tree on the runtime. The caller reads rows from the returned
//! [`RunningQuery`].

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::errors::{ExecutorError, ExecutorResult};
use crate::ast::Statement;
use crate::datasource::{CancelHandle, DataSourceManager};
use crate::observability::{Event, Logger};
use crate::plan::{
    cancel_handles, CostBasedOptimizer, ExplainPlan, Operator, Optimizer, Planner, PlannerError,
    PlannerOptions, PlannerResult,
};
use crate::value::Value;

pub struct QueryEngine {
    planner: Planner,
    optimizer: Box<dyn Optimizer>,
}

impl QueryEngine {
    pub fn new(data_sources: Arc<dyn DataSourceManager>, options: PlannerOptions) -> Self {
        Self::with_optimizer(data_sources, options, Box::new(CostBasedOptimizer::new()))
    }

    pub fn with_optimizer(
        data_sources: Arc<dyn DataSourceManager>,
        options: PlannerOptions,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            planner: Planner::with_options(data_sources, options),
            optimizer,
        }
    }

    /// Plans `statement` and returns the cheapest candidate
    pub fn prepare(&self, statement: &Statement) -> PlannerResult<Box<dyn Operator>> {
        let plans = self.planner.plan(statement)?;
        let bucket = bucket_of(statement);
        self.optimizer
            .choose_optimal_plan(plans)
            .ok_or_else(|| PlannerError::no_access_path(&bucket))
    }

    /// Every candidate plan and the optimizer's choice
    pub fn explain(&self, statement: &Statement) -> PlannerResult<ExplainPlan> {
        let plans = self.planner.plan(statement)?;
        let chosen = self.optimizer.choose(&plans);
        Ok(ExplainPlan::from_plans(&plans, chosen))
    }

    /// Plans and starts `statement`
    pub fn start(&self, statement: &Statement) -> PlannerResult<RunningQuery> {
        let id = Uuid::new_v4();
        let bucket = bucket_of(statement);
        let id_str = id.to_string();
        Logger::info(
            Event::QueryReceived,
            &[
                ("bucket", &bucket),
                ("query_id", &id_str),
                ("statement", &statement.to_string()),
            ],
        );

        let plan = match self.prepare(statement) {
            Ok(plan) => plan,
            Err(err) => {
                Logger::error(
                    Event::QueryFailed,
                    &[("error", &err.to_string()), ("query_id", &id_str)],
                );
                return Err(err);
            }
        };

        launch(id, plan)
    }
}

fn launch(id: Uuid, plan: Box<dyn Operator>) -> PlannerResult<RunningQuery> {
    RunningQuery::start(id, plan).map_err(|e| PlannerError::plan_not_runnable(e.message()))
}

fn bucket_of(statement: &Statement) -> String {
    statement
        .as_select()
        .and_then(|select| select.sources().first())
        .map(|source| source.bucket.clone())
        .unwrap_or_default()
}

/// A started plan: its output rows and the cancel handles of its scans
pub struct RunningQuery {
    id: Uuid,
    rows: mpsc::Receiver<Value>,
    cancel: Vec<CancelHandle>,
    started: Instant,
}

impl RunningQuery {
    /// Spawns `plan` and takes ownership of its output
    pub fn start(id: Uuid, mut plan: Box<dyn Operator>) -> ExecutorResult<Self> {
        let cancel = cancel_handles(plan.as_ref());
        let rows = plan
            .take_output()
            .ok_or_else(|| ExecutorError::execution_failed("plan output already taken"))?;
        tokio::spawn(plan.run());
        Ok(Self {
            id,
            rows,
            cancel,
            started: Instant::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Next row, `None` at end of stream
    pub async fn next(&mut self) -> Option<Value> {
        self.rows.recv().await
    }

    /// Signals every scan in the plan to stop
    pub fn cancel(&self) {
        for handle in &self.cancel {
            handle.cancel();
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    /// Reads every remaining row
    pub async fn collect(mut self) -> Vec<Value> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BooleanExpression, Expression, SelectStatement, SortExpression};
    use crate::datasource::{MemoryDataSource, MemoryDataSourceManager};
    use crate::plan::mock::MockOperator;
    use crate::plan::PlannerErrorCode;
    use serde_json::json;

    fn engine() -> QueryEngine {
        let docs = vec![
            ("1".to_string(), Value::from(json!({"name": "will", "age": 39}))),
            ("2".to_string(), Value::from(json!({"name": "kid", "age": 9}))),
            ("3".to_string(), Value::from(json!({"name": "ann", "age": 27}))),
            ("4".to_string(), Value::from(json!({"name": "bob", "age": 61}))),
        ];
        let mut manager = MemoryDataSourceManager::new();
        manager.add(MemoryDataSource::new("people", docs, &["doc.age".to_string()]));
        QueryEngine::new(Arc::new(manager), PlannerOptions::default())
    }

    fn adults() -> Statement {
        Statement::Select(
            SelectStatement::new()
                .from("people")
                .filter(BooleanExpression::gt(
                    Expression::property("doc.age"),
                    Expression::number(18.0),
                ))
                .order_by(SortExpression::descending(Expression::property("doc.age")))
                .select(Expression::property("doc.name")),
        )
    }

    #[tokio::test]
    async fn test_start_and_collect() {
        let query = engine().start(&adults()).unwrap();
        let rows = query.collect().await;
        assert_eq!(
            rows,
            vec![Value::from("bob"), Value::from("will"), Value::from("ann")]
        );
    }

    #[tokio::test]
    async fn test_explain_lists_candidates() {
        let explain = engine().explain(&adults()).unwrap();
        assert_eq!(explain.candidates.len(), 2);
        assert!(explain.chosen.is_some());
    }

    #[tokio::test]
    async fn test_unknown_bucket() {
        let statement = Statement::Select(SelectStatement::new().from("ghosts"));
        let err = engine().start(&statement).err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_launch_reports_unrunnable_plan() {
        let mut plan: Box<dyn Operator> = Box::new(MockOperator::new(vec![Value::from(1i64)]));
        assert!(plan.take_output().is_some());

        let err = launch(Uuid::new_v4(), plan).err().unwrap();
        assert_eq!(err.code(), PlannerErrorCode::AeroQueryPlanNotRunnable);
        assert!(err.message().contains("plan output already taken"));
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancel_ends_the_stream() {
        let docs = (0..5000).map(|i| (format!("{:05}", i), Value::from(json!({ "n": i }))));
        let mut manager = MemoryDataSourceManager::new();
        manager.add(MemoryDataSource::new("big", docs, &[]));
        let options = PlannerOptions {
            channel_capacity: 1,
            batch_size: 10,
        };
        let engine = QueryEngine::new(Arc::new(manager), options);

        let statement = Statement::Select(SelectStatement::new().from("big"));
        let mut query = engine.start(&statement).unwrap();
        assert!(query.next().await.is_some());
        query.cancel();

        let rest = tokio::time::timeout(std::time::Duration::from_secs(5), query.collect())
            .await
            .expect("stream should end after cancel");
        assert!(rest.len() < 4999);
    }
}
