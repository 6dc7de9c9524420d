//! Query AST
//!
//! Contains:
//! - [`Context`]: path resolution over one document
//! - [`Expression`]: literals, properties and arithmetic
//! - [`BooleanExpression`]: comparisons and connectives with NNF/CNF,
//!   boolean factors, sargability and selectivity
//! - [`Statement`]: SELECT statements and the JSON statement format
//!
//! Expressions are immutable. Planning clones what it needs.

mod boolean;
mod context;
mod errors;
mod expression;
mod sort;
mod statement;

pub use boolean::{BooleanExpression, Comparison, ComparisonOperator};
pub use context::{parse_path, Context, PathElement, PathError};
pub use errors::{AstError, AstErrorCode, AstResult};
pub use expression::{Arithmetic, ArithmeticOperator, EvalResult, Expression, Literal, Property};
pub use sort::SortExpression;
pub use statement::{
    parse_boolean, parse_expression, DataSourceRef, SelectStatement, Statement, AST_DIALECT,
    AST_VERSION,
};
