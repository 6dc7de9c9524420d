//! Planner error types
//!
//! Error codes:
//! - AERO_QUERY_UNKNOWN_DATASOURCE (REJECT)
//! - AERO_QUERY_UNSUPPORTED_SOURCE_COUNT (ERROR)
//! - AERO_QUERY_NO_ACCESS_PATH (ERROR)
//! - AERO_QUERY_UNSUPPORTED_STATEMENT (ERROR)

use std::fmt;

use crate::datasource::DataSourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request names a collection that does not exist
    Reject,
    /// Request cannot be planned
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// FROM names an unknown collection
    AeroQueryUnknownDataSource,
    /// FROM lists zero or several collections
    AeroQueryUnsupportedSourceCount,
    /// No access path could serve the statement
    AeroQueryNoAccessPath,
    /// Statement kind has no planner
    AeroQueryUnsupportedStatement,
    /// Chosen plan could not be started
    AeroQueryPlanNotRunnable,
}

impl PlannerErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AeroQueryUnknownDataSource => "AERO_QUERY_UNKNOWN_DATASOURCE",
            PlannerErrorCode::AeroQueryUnsupportedSourceCount => {
                "AERO_QUERY_UNSUPPORTED_SOURCE_COUNT"
            }
            PlannerErrorCode::AeroQueryNoAccessPath => "AERO_QUERY_NO_ACCESS_PATH",
            PlannerErrorCode::AeroQueryUnsupportedStatement => "AERO_QUERY_UNSUPPORTED_STATEMENT",
            PlannerErrorCode::AeroQueryPlanNotRunnable => "AERO_QUERY_PLAN_NOT_RUNNABLE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::AeroQueryUnknownDataSource => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
}

impl PlannerError {
    pub fn unknown_data_source(name: &str) -> Self {
        Self {
            code: PlannerErrorCode::AeroQueryUnknownDataSource,
            message: format!("data source '{}' does not exist", name),
        }
    }

    pub fn unsupported_source_count(count: usize) -> Self {
        Self {
            code: PlannerErrorCode::AeroQueryUnsupportedSourceCount,
            message: format!("exactly 1 data source is supported, statement has {}", count),
        }
    }

    pub fn no_access_path(name: &str) -> Self {
        Self {
            code: PlannerErrorCode::AeroQueryNoAccessPath,
            message: format!("no access path of '{}' can serve the statement", name),
        }
    }

    pub fn unsupported_statement(kind: &str) -> Self {
        Self {
            code: PlannerErrorCode::AeroQueryUnsupportedStatement,
            message: format!("statement type '{}' cannot be planned", kind),
        }
    }

    pub fn plan_not_runnable(reason: &str) -> Self {
        Self {
            code: PlannerErrorCode::AeroQueryPlanNotRunnable,
            message: format!("chosen plan cannot be started: {}", reason),
        }
    }

    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the request named a collection that does not exist
    pub fn is_not_found(&self) -> bool {
        self.code == PlannerErrorCode::AeroQueryUnknownDataSource
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)
    }
}

impl std::error::Error for PlannerError {}

impl From<DataSourceError> for PlannerError {
    fn from(err: DataSourceError) -> Self {
        if err.is_not_found() {
            return Self {
                code: PlannerErrorCode::AeroQueryUnknownDataSource,
                message: err.message().to_string(),
            };
        }
        Self {
            code: PlannerErrorCode::AeroQueryNoAccessPath,
            message: err.message().to_string(),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
