//! Statements and the JSON statement format
//!
//! A request body is an envelope around one statement:
//!
//! ```json
//! {
//!   "type": "cbqast",
//!   "version": "1",
//!   "statement": {
//!     "type": "select",
//!     "where":  { "type": "compare", "operator": "gt",
//!                 "left": { "type": "property", "path": "doc.abv" },
//!                 "right": { "type": "literal", "value": 5 } },
//!     "select": { "type": "property", "path": "doc.name" },
//!     "order":  [ { "expr": { "type": "property", "path": "doc.abv" }, "ascending": false } ],
//!     "limit": 10,
//!     "offset": 20
//!   }
//! }
//! ```
//!
//! `offset` is only read when `limit` is present.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as Json};

use super::boolean::{BooleanExpression, ComparisonOperator};
use super::errors::{AstError, AstResult};
use super::expression::{ArithmeticOperator, Expression, Literal};
use super::sort::SortExpression;

/// Dialect identifier of the JSON statement envelope
pub const AST_DIALECT: &str = "cbqast";

/// Supported envelope version
pub const AST_VERSION: &str = "1";

/// A named collection a statement reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSourceRef {
    pub bucket: String,
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    from: Vec<DataSourceRef>,
    where_clause: BooleanExpression,
    select: Option<Expression>,
    order: Vec<SortExpression>,
    limit: i64,
    offset: i64,
}

impl Default for SelectStatement {
    fn default() -> Self {
        Self {
            from: Vec::new(),
            where_clause: BooleanExpression::Literal(true),
            select: None,
            order: Vec::new(),
            limit: -1,
            offset: 0,
        }
    }
}

impl SelectStatement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source
    pub fn from(mut self, bucket: impl Into<String>) -> Self {
        self.from.push(DataSourceRef {
            bucket: bucket.into(),
        });
        self
    }

    pub fn filter(mut self, predicate: BooleanExpression) -> Self {
        self.where_clause = predicate;
        self
    }

    pub fn select(mut self, projection: Expression) -> Self {
        self.select = Some(projection);
        self
    }

    pub fn order_by(mut self, key: SortExpression) -> Self {
        self.order.push(key);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Replaces all sources with a single bucket
    pub fn set_from(&mut self, bucket: impl Into<String>) {
        self.from = vec![DataSourceRef {
            bucket: bucket.into(),
        }];
    }

    pub fn sources(&self) -> &[DataSourceRef] {
        &self.from
    }

    pub fn where_clause(&self) -> &BooleanExpression {
        &self.where_clause
    }

    pub fn projection(&self) -> Option<&Expression> {
        self.select.as_ref()
    }

    pub fn order(&self) -> &[SortExpression] {
        &self.order
    }

    /// Row limit, -1 when unlimited
    pub fn limit_value(&self) -> i64 {
        self.limit
    }

    pub fn offset_value(&self) -> i64 {
        self.offset
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.select {
            Some(projection) => write!(f, "SELECT {}", projection)?,
            None => write!(f, "SELECT *")?,
        }
        let buckets: Vec<&str> = self.from.iter().map(|s| s.bucket.as_str()).collect();
        write!(f, " FROM {}", buckets.join(", "))?;
        write!(f, " WHERE {}", self.where_clause)?;
        if !self.order.is_empty() {
            let keys: Vec<String> = self.order.iter().map(|k| k.to_string()).collect();
            write!(f, " ORDER BY {}", keys.join(", "))?;
        }
        if self.limit >= 0 {
            write!(f, " LIMIT {}", self.limit)?;
            if self.offset > 0 {
                write!(f, " OFFSET {}", self.offset)?;
            }
        }
        Ok(())
    }
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
}

impl Statement {
    /// Builds a statement from a JSON request body against `bucket`
    pub fn from_json_request(bucket: &str, body: &Json) -> AstResult<Statement> {
        let envelope = body
            .as_object()
            .ok_or_else(|| AstError::wrong_type("request", "an object"))?;

        let dialect = required_str(envelope, "type", "request")?;
        if dialect != AST_DIALECT {
            return Err(AstError::unsupported(format!(
                "request type '{}', expected '{}'",
                dialect, AST_DIALECT
            )));
        }

        let version = required_str(envelope, "version", "request")?;
        if version != AST_VERSION {
            return Err(AstError::unsupported(format!(
                "request version '{}', expected '{}'",
                version, AST_VERSION
            )));
        }

        let body = envelope
            .get("statement")
            .ok_or_else(|| AstError::missing("statement", "request"))?
            .as_object()
            .ok_or_else(|| AstError::wrong_type("statement", "an object"))?;

        match required_str(body, "type", "statement")? {
            "select" => {
                let mut select = parse_select(body)?;
                select.set_from(bucket);
                Ok(Statement::Select(select))
            }
            other => Err(AstError::unsupported(format!("statement type '{}'", other))),
        }
    }

    pub fn as_select(&self) -> Option<&SelectStatement> {
        match self {
            Statement::Select(select) => Some(select),
        }
    }

    /// Replaces the statement's sources with a single bucket
    pub fn set_from(&mut self, bucket: impl Into<String>) {
        match self {
            Statement::Select(select) => select.set_from(bucket),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Select(select) => write!(f, "{}", select),
        }
    }
}

fn required_str<'a>(object: &'a Map<String, Json>, member: &str, within: &str) -> AstResult<&'a str> {
    object
        .get(member)
        .ok_or_else(|| AstError::missing(member, within))?
        .as_str()
        .ok_or_else(|| AstError::wrong_type(member, "a string"))
}

fn required<'a>(object: &'a Map<String, Json>, member: &str, within: &str) -> AstResult<&'a Json> {
    object
        .get(member)
        .ok_or_else(|| AstError::missing(member, within))
}

fn non_negative_integer(value: &Json, member: &str) -> AstResult<i64> {
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
                .map(|n| n as i64)
        })
        .filter(|n| *n >= 0)
        .ok_or_else(|| AstError::wrong_type(member, "a non-negative integer"))
}

fn parse_select(body: &Map<String, Json>) -> AstResult<SelectStatement> {
    let mut select = SelectStatement::new();

    if let Some(predicate) = body.get("where") {
        select = select.filter(parse_boolean(predicate)?);
    }

    if let Some(projection) = body.get("select") {
        select = select.select(parse_expression(projection)?);
    }

    if let Some(order) = body.get("order") {
        let keys = order
            .as_array()
            .ok_or_else(|| AstError::wrong_type("order", "an array"))?;
        for key in keys {
            let key = key
                .as_object()
                .ok_or_else(|| AstError::wrong_type("order entry", "an object"))?;
            let expr = parse_expression(required(key, "expr", "order entry")?)?;
            let ascending = match key.get("ascending") {
                None => true,
                Some(flag) => flag
                    .as_bool()
                    .ok_or_else(|| AstError::wrong_type("ascending", "a boolean"))?,
            };
            select = select.order_by(SortExpression::new(expr, ascending));
        }
    }

    if let Some(limit) = body.get("limit") {
        select = select.limit(non_negative_integer(limit, "limit")?);
        if let Some(offset) = body.get("offset") {
            select = select.offset(non_negative_integer(offset, "offset")?);
        }
    }

    Ok(select)
}

/// Parses an expression object of any kind
pub fn parse_expression(json: &Json) -> AstResult<Expression> {
    let object = json
        .as_object()
        .ok_or_else(|| AstError::wrong_type("expression", "an object"))?;

    match required_str(object, "type", "expression")? {
        "literal" => parse_literal(required(object, "value", "literal")?),
        "property" => Ok(Expression::property(required_str(object, "path", "property")?)),
        "arithmetic" => {
            let name = required_str(object, "operator", "arithmetic")?;
            let operator = ArithmeticOperator::from_name(name).ok_or_else(|| {
                AstError::unsupported(format!("arithmetic operator '{}'", name))
            })?;
            let left = parse_expression(required(object, "left", "arithmetic")?)?;
            let right = parse_expression(required(object, "right", "arithmetic")?)?;
            Ok(Expression::arithmetic(operator, left, right))
        }
        "compare" | "and" | "or" | "not" => parse_boolean(json).map(Expression::Boolean),
        other => Err(AstError::unsupported(format!("expression type '{}'", other))),
    }
}

/// Parses an expression object that must be boolean valued
pub fn parse_boolean(json: &Json) -> AstResult<BooleanExpression> {
    let object = json
        .as_object()
        .ok_or_else(|| AstError::wrong_type("expression", "an object"))?;

    match required_str(object, "type", "expression")? {
        "literal" => required(object, "value", "literal")?
            .as_bool()
            .map(BooleanExpression::Literal)
            .ok_or_else(|| AstError::wrong_type("value", "a boolean in a boolean position")),
        "compare" => {
            let name = required_str(object, "operator", "compare")?;
            let operator = ComparisonOperator::from_name(name).ok_or_else(|| {
                AstError::unsupported(format!("comparison operator '{}'", name))
            })?;
            let left = parse_expression(required(object, "left", "compare")?)?;
            let right = parse_expression(required(object, "right", "compare")?)?;
            Ok(BooleanExpression::compare(operator, left, right))
        }
        kind @ ("and" | "or") => {
            let left = parse_boolean(required(object, "left", kind)?)?;
            let right = parse_boolean(required(object, "right", kind)?)?;
            if kind == "and" {
                Ok(BooleanExpression::and(vec![left, right]))
            } else {
                Ok(BooleanExpression::or(vec![left, right]))
            }
        }
        "not" => Ok(BooleanExpression::not(parse_boolean(required(
            object, "operand", "not",
        )?)?)),
        other => Err(AstError::invalid(format!(
            "expression type '{}' is not boolean valued",
            other
        ))),
    }
}

fn parse_literal(value: &Json) -> AstResult<Expression> {
    match value {
        Json::Null => Ok(Expression::null()),
        Json::Bool(b) => Ok(Expression::boolean(*b)),
        Json::Number(n) => n
            .as_f64()
            .map(Expression::number)
            .ok_or_else(|| AstError::invalid(format!("number {} is not representable", n))),
        Json::String(s) => Ok(Expression::string(s.clone())),
        Json::Array(items) => items
            .iter()
            .map(parse_expression)
            .collect::<AstResult<Vec<_>>>()
            .map(Expression::array),
        Json::Object(entries) => {
            let mut map = BTreeMap::new();
            for (key, item) in entries {
                map.insert(key.clone(), parse_expression(item)?);
            }
            Ok(Expression::Literal(Literal::Object(map)))
        }
    }
}
