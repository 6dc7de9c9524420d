//! Statement construction error types
//!
//! Error codes:
//! - AERO_AST_INVALID (REJECT)
//! - AERO_AST_UNSUPPORTED (REJECT)

use std::fmt;

/// Severity levels for statement errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AstErrorCode {
    /// Malformed request envelope or statement body
    AeroAstInvalid,
    /// Well-formed, but names a statement, expression or operator we do not know
    AeroAstUnsupported,
}

impl AstErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            AstErrorCode::AeroAstInvalid => "AERO_AST_INVALID",
            AstErrorCode::AeroAstUnsupported => "AERO_AST_UNSUPPORTED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for AstErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error raised while building a statement from a request
#[derive(Debug, Clone)]
pub struct AstError {
    code: AstErrorCode,
    message: String,
}

impl AstError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: AstErrorCode::AeroAstInvalid,
            message: message.into(),
        }
    }

    /// Missing required member of a JSON object
    pub fn missing(member: &str, within: &str) -> Self {
        Self::invalid(format!("missing '{}' in {}", member, within))
    }

    /// Member present but of the wrong JSON type
    pub fn wrong_type(member: &str, expected: &str) -> Self {
        Self::invalid(format!("'{}' must be {}", member, expected))
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            code: AstErrorCode::AeroAstUnsupported,
            message: message.into(),
        }
    }

    pub fn code(&self) -> AstErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for AstError {}

pub type AstResult<T> = Result<T, AstError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_format() {
        let err = AstError::missing("statement", "request");
        assert_eq!(
            err.to_string(),
            "[REJECT] AERO_AST_INVALID: missing 'statement' in request"
        );
    }

    #[test]
    fn test_unsupported_code() {
        let err = AstError::unsupported("statement type 'delete'");
        assert_eq!(err.code(), AstErrorCode::AeroAstUnsupported);
        assert_eq!(err.code().code(), "AERO_AST_UNSUPPORTED");
    }
}
