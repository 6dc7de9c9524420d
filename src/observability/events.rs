//! Observable events
//!
//! Every log line names one of these.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    ServerStart,
    ServerStop,
    ConfigLoaded,
    DataSourceLoaded,

    // Statistics
    StatsRefreshStart,
    StatsRefreshComplete,
    StatsRefreshFailed,

    // Planning
    QueryReceived,
    PlanCandidate,
    PlanChosen,
    AccessPathSkipped,
    RangeMerged,

    // Execution
    ScanFailed,
    FetchFailed,
    FactorEvaluationFailed,
    ProjectionFailed,
    SortKeyFailed,
    RowSerializationFailed,
    QueryCancelled,
    QueryComplete,
    QueryFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServerStart => "SERVER_START",
            Event::ServerStop => "SERVER_STOP",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::DataSourceLoaded => "DATASOURCE_LOADED",

            Event::StatsRefreshStart => "STATS_REFRESH_BEGIN",
            Event::StatsRefreshComplete => "STATS_REFRESH_COMPLETE",
            Event::StatsRefreshFailed => "STATS_REFRESH_FAILED",

            Event::QueryReceived => "QUERY_BEGIN",
            Event::PlanCandidate => "PLAN_CANDIDATE",
            Event::PlanChosen => "PLAN_CHOSEN",
            Event::AccessPathSkipped => "ACCESS_PATH_SKIPPED",
            Event::RangeMerged => "RANGE_MERGED",

            Event::ScanFailed => "SCAN_FAILED",
            Event::FetchFailed => "FETCH_FAILED",
            Event::FactorEvaluationFailed => "FACTOR_EVALUATION_FAILED",
            Event::ProjectionFailed => "PROJECTION_FAILED",
            Event::SortKeyFailed => "SORT_KEY_FAILED",
            Event::RowSerializationFailed => "ROW_SERIALIZATION_FAILED",
            Event::QueryCancelled => "QUERY_CANCELLED",
            Event::QueryComplete => "QUERY_COMPLETE",
            Event::QueryFailed => "QUERY_FAILED",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
