//! Builds [`PathStatistics`] from an index's grouped keys
//!
//! Input is the list of distinct index keys in collation order, each with
//! the number of rows carrying it. Quantiles are filled greedily: a range
//! closes once its count exceeds the current target, and the target is
//! recomputed from the rows and ranges still remaining.

use super::pathstats::{PathStatistics, QuantileRange, NUM_QUANTILES};
use crate::value::Value;

/// Builds statistics from `(key, count)` groups sorted by collation
pub fn build_path_statistics<I>(groups: I) -> PathStatistics
where
    I: IntoIterator<Item = (Value, i64)>,
{
    let groups: Vec<(Value, i64)> = groups.into_iter().filter(|(_, c)| *c > 0).collect();
    let rows: i64 = groups.iter().map(|(_, c)| *c).sum();

    let mut stats = PathStatistics::new(rows);
    stats.distinct = groups.len() as i64;
    stats.min = groups.first().map(|(k, _)| k.clone());
    stats.max = groups.last().map(|(k, _)| k.clone());

    let mut target = rows / NUM_QUANTILES as i64;
    let mut accounted = 0i64;
    let mut current: Option<QuantileRange> = None;

    for (key, count) in groups {
        stats.top_n.consider(key.clone(), count);

        let range = current.get_or_insert_with(|| QuantileRange::new(key.clone(), key.clone(), 0));
        range.end = key;
        range.count += count;

        if range.count > target {
            accounted += range.count;
            if let Some(done) = current.take() {
                stats.quantiles.push(done);
            }
            let remaining = NUM_QUANTILES.saturating_sub(stats.quantiles.len()) as i64;
            target = if remaining > 0 {
                (rows - accounted) / remaining
            } else {
                i64::MAX
            };
        }
    }

    if let Some(last) = current {
        stats.quantiles.push(last);
    }

    stats
}
