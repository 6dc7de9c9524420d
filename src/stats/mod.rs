//! Path statistics
//!
//! Statistics are per indexed path: row count, distinct count, min/max,
//! the most frequent values and a quantile histogram. They only ever feed
//! cost estimates.
//!
//! A [`StatsStore`] publishes whole snapshots. A refresh builds a complete
//! new map and swaps it in; readers holding the previous snapshot keep a
//! consistent view.

mod builder;
mod pathstats;
mod topn;

pub use builder::build_path_statistics;
pub use pathstats::{PathStatistics, QuantileRange, NUM_FREQUENT_VALUES, NUM_QUANTILES, UNKNOWN_ROWS};
pub use topn::{TopNContainer, TopNItem};

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Statistics keyed by property path
pub type PathStatsMap = HashMap<String, Arc<PathStatistics>>;

/// Atomically replaced statistics snapshot
#[derive(Debug, Default)]
pub struct StatsStore {
    current: RwLock<Arc<PathStatsMap>>,
}

impl StatsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<PathStatsMap> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the whole map
    pub fn publish(&self, stats: PathStatsMap) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(stats);
    }

    /// Publishes a new snapshot with one path's entry replaced
    pub fn replace_path(&self, path: impl Into<String>, stats: PathStatistics) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next: PathStatsMap = (**guard).clone();
        next.insert(path.into(), Arc::new(stats));
        *guard = Arc::new(next);
    }

    /// Statistics for one path
    pub fn get(&self, path: &str) -> Option<Arc<PathStatistics>> {
        self.snapshot().get(path).cloned()
    }
}
