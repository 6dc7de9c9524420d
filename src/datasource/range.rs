//! Index ranges
//!
//! An index is ordered by (key, document id). A [`ViewLocation`] is a point
//! in that order whose key may be an infinite boundary and whose document
//! id is always a boundary: `Min` sorts before every id with the same key,
//! `Max` after. A [`ViewRange`] is the closed interval between two
//! locations.

use std::cmp::Ordering;
use std::fmt;

use serde_json::json;

use crate::ast::ComparisonOperator;
use crate::value::{collate, Value};

/// Key side of a location
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    NegativeInfinity,
    Concrete(Value),
    PositiveInfinity,
}

impl Boundary {
    fn rank(&self) -> u8 {
        match self {
            Boundary::NegativeInfinity => 0,
            Boundary::Concrete(_) => 1,
            Boundary::PositiveInfinity => 2,
        }
    }

    pub fn compare(&self, other: &Boundary) -> Ordering {
        match (self, other) {
            (Boundary::Concrete(a), Boundary::Concrete(b)) => collate(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    /// Position of a concrete index key relative to this boundary
    fn compare_key(&self, key: &Value) -> Ordering {
        match self {
            Boundary::NegativeInfinity => Ordering::Less,
            Boundary::Concrete(v) => collate(v, key),
            Boundary::PositiveInfinity => Ordering::Greater,
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::NegativeInfinity => write!(f, "MIN"),
            Boundary::Concrete(v) => write!(f, "{}", v),
            Boundary::PositiveInfinity => write!(f, "MAX"),
        }
    }
}

/// Document id side of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocIdBoundary {
    Min,
    Max,
}

impl DocIdBoundary {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocIdBoundary::Min => "MIN_DOC_ID",
            DocIdBoundary::Max => "MAX_DOC_ID",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewLocation {
    pub key: Boundary,
    pub doc_id: DocIdBoundary,
}

impl ViewLocation {
    /// Before every index entry
    pub fn min() -> Self {
        Self {
            key: Boundary::NegativeInfinity,
            doc_id: DocIdBoundary::Min,
        }
    }

    /// After every index entry
    pub fn max() -> Self {
        Self {
            key: Boundary::PositiveInfinity,
            doc_id: DocIdBoundary::Max,
        }
    }

    /// Upper bound for entries below `key`, or at most `key` when inclusive
    pub fn less_than(key: Value, inclusive: bool) -> Self {
        Self {
            key: Boundary::Concrete(key),
            doc_id: if inclusive {
                DocIdBoundary::Max
            } else {
                DocIdBoundary::Min
            },
        }
    }

    /// Lower bound for entries above `key`, or at least `key` when inclusive
    pub fn greater_than(key: Value, inclusive: bool) -> Self {
        Self {
            key: Boundary::Concrete(key),
            doc_id: if inclusive {
                DocIdBoundary::Min
            } else {
                DocIdBoundary::Max
            },
        }
    }

    pub fn compare(&self, other: &ViewLocation) -> Ordering {
        self.key
            .compare(&other.key)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }

    pub fn is_min(&self) -> bool {
        *self == Self::min()
    }

    pub fn is_max(&self) -> bool {
        *self == Self::max()
    }

    /// Whether an index entry with `key` (and any concrete id) lies after
    /// this location
    fn precedes_key(&self, key: &Value) -> bool {
        match self.key.compare_key(key) {
            Ordering::Less => true,
            Ordering::Equal => self.doc_id == DocIdBoundary::Min,
            Ordering::Greater => false,
        }
    }

    /// Whether an index entry with `key` lies before this location
    fn follows_key(&self, key: &Value) -> bool {
        match self.key.compare_key(key) {
            Ordering::Greater => true,
            Ordering::Equal => self.doc_id == DocIdBoundary::Max,
            Ordering::Less => false,
        }
    }
}

impl fmt::Display for ViewLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_min() {
            return write!(f, "MIN");
        }
        if self.is_max() {
            return write!(f, "MAX");
        }
        write!(f, "{} {}", self.key, self.doc_id.as_str())
    }
}

/// Closed interval `[start, end]` over index locations
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRange {
    pub start: ViewLocation,
    pub end: ViewLocation,
}

impl ViewRange {
    pub fn new(start: ViewLocation, end: ViewLocation) -> Self {
        Self { start, end }
    }

    /// The whole index
    pub fn full() -> Self {
        Self::new(ViewLocation::min(), ViewLocation::max())
    }

    pub fn contains(&self, location: &ViewLocation) -> bool {
        self.start.compare(location) != Ordering::Greater
            && location.compare(&self.end) != Ordering::Greater
    }

    pub fn is_subset_of(&self, other: &ViewRange) -> bool {
        other.contains(&self.start) && other.contains(&self.end)
    }

    /// Whether index entries with `key` fall in this range
    pub fn includes_key(&self, key: &Value) -> bool {
        self.start.precedes_key(key) && self.end.follows_key(key)
    }

    /// Positions of the entries of `entries`, sorted by key collation, that
    /// fall in this range
    pub fn entry_span<T>(&self, entries: &[(Value, T)]) -> std::ops::Range<usize> {
        let start = entries.partition_point(|(key, _)| !self.start.precedes_key(key));
        let len = entries[start..].partition_point(|(key, _)| self.includes_key(key));
        start..start + len
    }

    /// Sorts by start and coalesces overlapping ranges. Empty ranges are
    /// dropped. Every entry in the input falls in exactly one output range.
    pub fn coalesce(ranges: &[ViewRange]) -> Vec<ViewRange> {
        let mut sorted: Vec<ViewRange> = ranges
            .iter()
            .filter(|range| range.start.compare(&range.end) != Ordering::Greater)
            .cloned()
            .collect();
        sorted.sort_by(|a, b| a.start.compare(&b.start));

        let mut merged: Vec<ViewRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match merged.last_mut() {
                Some(last) if range.start.compare(&last.end) != Ordering::Greater => {
                    if range.end.compare(&last.end) == Ordering::Greater {
                        last.end = range.end;
                    }
                }
                _ => merged.push(range),
            }
        }
        merged
    }

    /// Ranges selecting entries whose key satisfies `key <op> value`
    pub fn for_comparison(operator: ComparisonOperator, value: Value) -> Vec<ViewRange> {
        match operator {
            ComparisonOperator::Neq => vec![
                ViewRange::new(ViewLocation::min(), ViewLocation::less_than(value.clone(), false)),
                ViewRange::new(ViewLocation::greater_than(value, false), ViewLocation::max()),
            ],
            ComparisonOperator::Gt => vec![ViewRange::new(
                ViewLocation::greater_than(value, false),
                ViewLocation::max(),
            )],
            ComparisonOperator::Gte => vec![ViewRange::new(
                ViewLocation::greater_than(value, true),
                ViewLocation::max(),
            )],
            ComparisonOperator::Lt => vec![ViewRange::new(
                ViewLocation::min(),
                ViewLocation::less_than(value, false),
            )],
            ComparisonOperator::Lte => vec![ViewRange::new(
                ViewLocation::min(),
                ViewLocation::less_than(value, true),
            )],
            ComparisonOperator::Eq => vec![ViewRange::new(
                ViewLocation::greater_than(value.clone(), true),
                ViewLocation::less_than(value, true),
            )],
        }
    }

    /// Merges `range` into `ranges`: it replaces the first range it is a
    /// subset of, is dropped if some range is a subset of it, and is
    /// appended otherwise.
    pub fn merge_into(ranges: &mut Vec<ViewRange>, range: ViewRange) {
        for existing in ranges.iter_mut() {
            if range.is_subset_of(existing) {
                *existing = range;
                return;
            }
            if existing.is_subset_of(&range) {
                return;
            }
        }
        ranges.push(range);
    }

    pub fn explain(&self) -> serde_json::Value {
        json!({
            "start": self.start.to_string(),
            "end": self.end.to_string(),
        })
    }
}

impl fmt::Display for ViewRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
