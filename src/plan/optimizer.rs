//! Plan selection

use super::operator::Operator;
use crate::observability::{Event, Logger};

pub trait Optimizer: Send + Sync {
    /// Index of the plan to run, `None` when there are no plans
    fn choose(&self, plans: &[Box<dyn Operator>]) -> Option<usize>;

    fn choose_optimal_plan(&self, mut plans: Vec<Box<dyn Operator>>) -> Option<Box<dyn Operator>> {
        let chosen = self.choose(&plans)?;
        Some(plans.swap_remove(chosen))
    }
}

/// Picks the lowest total cost; the first of equally cheap plans wins
#[derive(Debug, Default, Clone, Copy)]
pub struct CostBasedOptimizer;

impl CostBasedOptimizer {
    pub fn new() -> Self {
        Self
    }
}

impl Optimizer for CostBasedOptimizer {
    fn choose(&self, plans: &[Box<dyn Operator>]) -> Option<usize> {
        let mut cheapest: Option<(usize, f64)> = None;
        for (i, plan) in plans.iter().enumerate() {
            let cost = plan.total_cost();
            match cheapest {
                Some((_, best)) if cost >= best => {}
                _ => cheapest = Some((i, cost)),
            }
        }

        let (chosen, cost) = cheapest?;
        Logger::trace(
            Event::PlanChosen,
            &[
                ("candidates", &plans.len().to_string()),
                ("chosen", &chosen.to_string()),
                ("total_cost", &cost.to_string()),
            ],
        );
        Some(chosen)
    }
}
