//! Data source error types
//!
//! Error codes:
//! - AERO_DATASOURCE_NOT_FOUND (REJECT)
//! - AERO_DOCUMENT_NOT_FOUND (ERROR)
//! - AERO_DATASOURCE_LOAD_FAILED (ERROR)
//! - AERO_SCAN_FAILED (ERROR)

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request names something that does not exist
    Reject,
    /// Operation failed
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
pub enum DataSourceErrorCode {
    AeroDataSourceNotFound,
    AeroDocumentNotFound,
    AeroDataSourceLoadFailed,
    AeroScanFailed,
}

impl DataSourceErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            DataSourceErrorCode::AeroDataSourceNotFound => "AERO_DATASOURCE_NOT_FOUND",
            DataSourceErrorCode::AeroDocumentNotFound => "AERO_DOCUMENT_NOT_FOUND",
            DataSourceErrorCode::AeroDataSourceLoadFailed => "AERO_DATASOURCE_LOAD_FAILED",
            DataSourceErrorCode::AeroScanFailed => "AERO_SCAN_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DataSourceErrorCode::AeroDataSourceNotFound => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DataSourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone)]
pub struct DataSourceError {
    code: DataSourceErrorCode,
    message: String,
}

impl DataSourceError {
    pub fn not_found(name: &str) -> Self {
        Self {
            code: DataSourceErrorCode::AeroDataSourceNotFound,
            message: format!("data source '{}' does not exist", name),
        }
    }

    pub fn document_not_found(id: &str) -> Self {
        Self {
            code: DataSourceErrorCode::AeroDocumentNotFound,
            message: format!("document '{}' does not exist", id),
        }
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self {
            code: DataSourceErrorCode::AeroDataSourceLoadFailed,
            message: message.into(),
        }
    }

    pub fn scan_failed(message: impl Into<String>) -> Self {
        Self {
            code: DataSourceErrorCode::AeroScanFailed,
            message: message.into(),
        }
    }

    pub fn code(&self) -> DataSourceErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.code == DataSourceErrorCode::AeroDataSourceNotFound
    }
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)
    }
}

impl std::error::Error for DataSourceError {}

pub type DataSourceResult<T> = Result<T, DataSourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_reject() {
        let err = DataSourceError::not_found("beers");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "[REJECT] AERO_DATASOURCE_NOT_FOUND: data source 'beers' does not exist"
        );
    }

    #[test]
    fn test_document_not_found_is_error() {
        let err = DataSourceError::document_not_found("x");
        assert!(!err.is_not_found());
        assert_eq!(err.code().severity(), Severity::Error);
    }
}
