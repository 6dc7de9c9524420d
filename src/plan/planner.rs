//! Candidate plan construction
//!
//! One candidate per usable access path. Every candidate has the same
//! shape above its scan:
//!
//! ```text
//! Project(Limit?(Offset?(Order?(Filter(Fetch(Scan))))))
//! ```
//!
//! Filter re-checks every boolean factor, including those folded into
//! index ranges.

use std::sync::Arc;

use super::errors::{PlannerError, PlannerResult};
use super::fetch::Fetch;
use super::filter::Filter;
use super::limit::{Limit, Offset};
use super::operator::{Operator, DEFAULT_CHANNEL_CAPACITY};
use super::order::Order;
use super::project::Project;
use super::scan::{AllDocsScan, ViewScan};
use crate::ast::{BooleanExpression, SelectStatement, Statement};
use crate::datasource::{AccessPath, DataSource, DataSourceManager, DEFAULT_BATCH_SIZE};
use crate::observability::{Event, Logger};

/// Execution knobs applied to every operator the planner builds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerOptions {
    /// Rows buffered between two operators
    pub channel_capacity: usize,
    /// Index entries read per batch
    pub batch_size: usize,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

pub struct Planner {
    data_sources: Arc<dyn DataSourceManager>,
    options: PlannerOptions,
}

impl Planner {
    pub fn new(data_sources: Arc<dyn DataSourceManager>) -> Self {
        Self::with_options(data_sources, PlannerOptions::default())
    }

    pub fn with_options(data_sources: Arc<dyn DataSourceManager>, options: PlannerOptions) -> Self {
        Self {
            data_sources,
            options,
        }
    }

    pub fn options(&self) -> PlannerOptions {
        self.options
    }

    /// Builds every candidate plan for `statement`
    pub fn plan(&self, statement: &Statement) -> PlannerResult<Vec<Box<dyn Operator>>> {
        let Some(select) = statement.as_select() else {
            return Err(PlannerError::unsupported_statement(&statement.to_string()));
        };

        let sources = select.sources();
        if sources.len() != 1 {
            return Err(PlannerError::unsupported_source_count(sources.len()));
        }
        let bucket = &sources[0].bucket;
        let data_source = self.data_sources.get_data_source(bucket)?;

        let factors = select.where_clause().nnf().cnf().boolean_factors();

        let mut plans = Vec::new();
        for path in data_source.access_paths() {
            let Some(scan) = self.build_scan(&data_source, &path, &factors) else {
                Logger::trace(
                    Event::AccessPathSkipped,
                    &[("access_path", path.name()), ("bucket", bucket)],
                );
                continue;
            };
            let plan = self.layer(scan, &data_source, select, &factors);
            Logger::trace(
                Event::PlanCandidate,
                &[
                    ("access_path", path.name()),
                    ("estimated_rows", &plan.estimated_rows().to_string()),
                    ("total_cost", &plan.total_cost().to_string()),
                ],
            );
            plans.push(plan);
        }

        if plans.is_empty() {
            return Err(PlannerError::no_access_path(bucket));
        }
        Ok(plans)
    }

    fn build_scan(
        &self,
        data_source: &Arc<dyn DataSource>,
        path: &Arc<dyn AccessPath>,
        factors: &[BooleanExpression],
    ) -> Option<Box<dyn Operator>> {
        let capacity = self.options.channel_capacity;
        let batch_size = self.options.batch_size;

        if path.returns_all() {
            return Some(Box::new(AllDocsScan::new(
                Arc::clone(path),
                data_source.rows(),
                batch_size,
                capacity,
            )));
        }
        if !path.matches(factors) {
            return None;
        }

        let mut scan = ViewScan::new(
            Arc::clone(path),
            data_source.rows(),
            data_source.path_stats(),
            batch_size,
            capacity,
        );
        for factor in factors {
            scan.add_factor(factor);
        }
        Some(Box::new(scan))
    }

    fn layer(
        &self,
        scan: Box<dyn Operator>,
        data_source: &Arc<dyn DataSource>,
        select: &SelectStatement,
        factors: &[BooleanExpression],
    ) -> Box<dyn Operator> {
        let capacity = self.options.channel_capacity;

        let mut plan: Box<dyn Operator> =
            Box::new(Fetch::new(scan, Arc::clone(data_source), capacity));
        plan = Box::new(Filter::new(plan, factors.to_vec(), capacity));

        if !select.order().is_empty() {
            plan = Box::new(Order::new(plan, select.order().to_vec(), capacity));
        }
        if select.offset_value() > 0 {
            plan = Box::new(Offset::new(plan, select.offset_value(), capacity));
        }
        if select.limit_value() >= 0 {
            plan = Box::new(Limit::new(plan, select.limit_value(), capacity));
        }
        Box::new(Project::new(plan, select.projection().cloned(), capacity))
    }
}
