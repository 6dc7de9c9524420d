//! Sort keys

use std::fmt;

use super::expression::Expression;

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct SortExpression {
    pub expr: Expression,
    pub ascending: bool,
}

impl SortExpression {
    pub fn new(expr: Expression, ascending: bool) -> Self {
        Self { expr, ascending }
    }

    pub fn ascending(expr: Expression) -> Self {
        Self::new(expr, true)
    }

    pub fn descending(expr: Expression) -> Self {
        Self::new(expr, false)
    }
}

impl fmt::Display for SortExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.expr, direction)
    }
}
