//! Explain output
//!
//! Every candidate plan with its total cost, and which one the optimizer
//! picked.

use std::fmt;

use serde::Serialize;

use super::operator::Operator;

#[derive(Debug, Clone, Serialize)]
pub struct CandidatePlan {
    pub total_cost: f64,
    pub estimated_rows: i64,
    pub plan: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplainPlan {
    pub candidates: Vec<CandidatePlan>,
    /// Index into `candidates`
    pub chosen: Option<usize>,
}

impl ExplainPlan {
    pub fn from_plans(plans: &[Box<dyn Operator>], chosen: Option<usize>) -> Self {
        let candidates = plans
            .iter()
            .map(|plan| CandidatePlan {
                total_cost: plan.total_cost(),
                estimated_rows: plan.estimated_rows(),
                plan: plan.explain(),
            })
            .collect();
        Self { candidates, chosen }
    }

    pub fn chosen_plan(&self) -> Option<&CandidatePlan> {
        self.chosen.and_then(|i| self.candidates.get(i))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, candidate) in self.candidates.iter().enumerate() {
            let marker = if Some(i) == self.chosen { "*" } else { " " };
            writeln!(
                f,
                "{} plan {} cost={} rows={}",
                marker, i, candidate.total_cost, candidate.estimated_rows
            )?;
            let body = serde_json::to_string_pretty(&candidate.plan).map_err(|_| fmt::Error)?;
            for line in body.lines() {
                writeln!(f, "    {}", line)?;
            }
        }
        Ok(())
    }
}
