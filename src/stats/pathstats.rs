//! Per-path statistics and row-count estimators
//!
//! Estimators return `None` when the statistics cannot answer; callers
//! then fall back to prior selectivities.

use std::cmp::Ordering;

use super::topn::TopNContainer;
use crate::value::{collate, Value};

/// Size of the frequent-value table
pub const NUM_FREQUENT_VALUES: usize = 10;

/// Target number of quantile ranges
pub const NUM_QUANTILES: usize = 10;

/// Row count reported before any statistics have been gathered
pub const UNKNOWN_ROWS: i64 = i32::MAX as i64;

/// A closed value interval holding `count` rows
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileRange {
    pub start: Value,
    pub end: Value,
    pub count: i64,
}

impl QuantileRange {
    pub fn new(start: Value, end: Value, count: i64) -> Self {
        Self { start, end, count }
    }

    pub fn contains(&self, value: &Value) -> bool {
        collate(&self.start, value) != Ordering::Greater
            && collate(value, &self.end) != Ordering::Greater
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathStatistics {
    pub rows: i64,
    pub distinct: i64,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub top_n: TopNContainer,
    /// Ordered, non-overlapping
    pub quantiles: Vec<QuantileRange>,
}

impl PathStatistics {
    /// Empty statistics over `rows` rows
    pub fn new(rows: i64) -> Self {
        Self {
            rows,
            distinct: 0,
            min: None,
            max: None,
            top_n: TopNContainer::new(NUM_FREQUENT_VALUES),
            quantiles: Vec::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ROWS)
    }

    /// Rows equal to `value`: exact from the frequent-value table, else the
    /// count of the first quantile containing it
    pub fn rows_with_value(&self, value: &Value) -> Option<f64> {
        if let Some(count) = self.top_n.num_items_with_key(value) {
            if count > 0 {
                return Some(count as f64);
            }
        }
        self.quantiles
            .iter()
            .find(|q| q.contains(value))
            .map(|q| q.count as f64)
    }

    pub fn rows_without_value(&self, value: &Value) -> Option<f64> {
        self.rows_with_value(value)
            .map(|with| self.rows as f64 - with)
    }

    /// Sum of quantiles starting below `value`
    pub fn rows_less_than(&self, value: &Value) -> Option<f64> {
        if self.quantiles.is_empty() {
            return None;
        }
        Some(
            self.quantiles
                .iter()
                .filter(|q| collate(&q.start, value) == Ordering::Less)
                .map(|q| q.count as f64)
                .sum(),
        )
    }

    /// All rows minus quantiles ending below `value`
    pub fn rows_greater_than(&self, value: &Value) -> Option<f64> {
        if self.quantiles.is_empty() {
            return None;
        }
        let below: f64 = self
            .quantiles
            .iter()
            .filter(|q| collate(&q.end, value) == Ordering::Less)
            .map(|q| q.count as f64)
            .sum();
        Some(self.rows as f64 - below)
    }
}
