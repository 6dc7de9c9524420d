//! Query planning and streaming execution operators
//!
//! The [`Planner`] turns a statement into one candidate operator tree per
//! usable access path; an [`Optimizer`] picks one by estimated cost.
//!
//! # Cost model
//!
//! Costs are abstract units, not time:
//!
//! - Scans: estimated rows / `BATCH_SIZE` * `NETWORK_COST`
//! - Fetch: estimated rows + `NETWORK_COST`
//! - Filter: estimated rows * `CPU_COST`
//! - Order: n log10 n
//! - Offset, Limit, Project: 0
//!
//! Estimated rows come from the scan and pass through every layer above
//! it unchanged.

mod errors;
mod explain;
mod fetch;
mod filter;
mod limit;
#[cfg(test)]
pub(crate) mod mock;
mod operator;
mod optimizer;
mod order;
mod planner;
mod project;
mod scan;

pub use errors::{PlannerError, PlannerErrorCode, PlannerResult};
pub use explain::{CandidatePlan, ExplainPlan};
pub use fetch::Fetch;
pub use filter::Filter;
pub use limit::{Limit, Offset};
pub use operator::{
    cancel_handles, chain_names, describe, Operator, BATCH_SIZE, CPU_COST,
    DEFAULT_CHANNEL_CAPACITY, NETWORK_COST,
};
pub use optimizer::{CostBasedOptimizer, Optimizer};
pub use order::Order;
pub use planner::{Planner, PlannerOptions};
pub use project::Project;
pub use scan::{AllDocsScan, ViewScan};
