//! Expression tree
//!
//! Expressions are immutable once built and evaluate against a [`Context`]
//! to a [`Value`]. Boolean-valued expressions live in
//! [`BooleanExpression`] and are embedded here through
//! [`Expression::Boolean`].
//!
//! Arithmetic on mismatched kinds is not an error. It evaluates to
//! `null`, the inapplicable marker, which never satisfies a comparison
//! against a non-null value.

use std::collections::BTreeMap;
use std::fmt;

use super::boolean::BooleanExpression;
use super::context::{Context, PathError};
use crate::value::Value;

/// Result of evaluating an expression against one document
pub type EvalResult<T> = Result<T, PathError>;

/// Literal constructor. Booleans are [`BooleanExpression::Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Number(f64),
    String(String),
    Array(Vec<Expression>),
    Object(BTreeMap<String, Expression>),
}

/// Reference to a document path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    path: String,
}

impl Property {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOperator::Plus => "+",
            ArithmeticOperator::Minus => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }

    /// Parses the operator names used by the JSON statement format
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "plus" => Some(ArithmeticOperator::Plus),
            "minus" => Some(ArithmeticOperator::Minus),
            "mult" => Some(ArithmeticOperator::Multiply),
            "div" => Some(ArithmeticOperator::Divide),
            _ => None,
        }
    }

    fn apply(&self, left: Value, right: Value) -> Value {
        match (self, left, right) {
            (ArithmeticOperator::Plus, Value::String(l), Value::String(r)) => {
                Value::String(l + &r)
            }
            (op, Value::Number(l), Value::Number(r)) => Value::Number(match op {
                ArithmeticOperator::Plus => l + r,
                ArithmeticOperator::Minus => l - r,
                ArithmeticOperator::Multiply => l * r,
                ArithmeticOperator::Divide => l / r,
            }),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arithmetic {
    operator: ArithmeticOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl Arithmetic {
    pub fn new(operator: ArithmeticOperator, left: Expression, right: Expression) -> Self {
        Self {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn operator(&self) -> ArithmeticOperator {
        self.operator
    }
}

/// Any expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Property(Property),
    Arithmetic(Arithmetic),
    Boolean(BooleanExpression),
}

impl Expression {
    pub fn null() -> Self {
        Expression::Literal(Literal::Null)
    }

    pub fn number(n: f64) -> Self {
        Expression::Literal(Literal::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        Expression::Boolean(BooleanExpression::Literal(b))
    }

    pub fn array(items: Vec<Expression>) -> Self {
        Expression::Literal(Literal::Array(items))
    }

    pub fn object<K: Into<String>>(entries: Vec<(K, Expression)>) -> Self {
        Expression::Literal(Literal::Object(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn property(path: impl Into<String>) -> Self {
        Expression::Property(Property::new(path))
    }

    pub fn arithmetic(operator: ArithmeticOperator, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic(Arithmetic::new(operator, left, right))
    }

    pub fn plus(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Plus, left, right)
    }

    pub fn minus(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Minus, left, right)
    }

    pub fn multiply(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Multiply, left, right)
    }

    pub fn divide(left: Expression, right: Expression) -> Self {
        Self::arithmetic(ArithmeticOperator::Divide, left, right)
    }

    /// Builds the literal expression that evaluates back to `value`
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Expression::null(),
            Value::Bool(b) => Expression::boolean(*b),
            Value::Number(n) => Expression::number(*n),
            Value::String(s) => Expression::string(s.clone()),
            Value::Array(items) => {
                Expression::array(items.iter().map(Expression::from_value).collect())
            }
            Value::Object(map) => Expression::Literal(Literal::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Expression::from_value(v)))
                    .collect(),
            )),
        }
    }

    /// Evaluates the expression against a document context
    pub fn evaluate(&self, ctx: &Context<'_>) -> EvalResult<Value> {
        match self {
            Expression::Literal(literal) => match literal {
                Literal::Null => Ok(Value::Null),
                Literal::Number(n) => Ok(Value::Number(*n)),
                Literal::String(s) => Ok(Value::String(s.clone())),
                Literal::Array(items) => {
                    let values = items
                        .iter()
                        .map(|item| item.evaluate(ctx))
                        .collect::<EvalResult<Vec<_>>>()?;
                    Ok(Value::Array(values))
                }
                Literal::Object(entries) => {
                    let mut map = BTreeMap::new();
                    for (key, item) in entries {
                        map.insert(key.clone(), item.evaluate(ctx)?);
                    }
                    Ok(Value::Object(map))
                }
            },
            Expression::Property(property) => ctx.get_path(property.path()),
            Expression::Arithmetic(arith) => {
                let left = arith.left.evaluate(ctx)?;
                let right = arith.right.evaluate(ctx)?;
                Ok(arith.operator.apply(left, right))
            }
            Expression::Boolean(b) => Ok(Value::Bool(b.evaluate_boolean(ctx)?)),
        }
    }

    /// Distinct property paths referenced anywhere in this expression,
    /// in first-seen order
    pub fn referenced_properties(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out
    }

    pub(crate) fn collect_properties(&self, out: &mut Vec<String>) {
        match self {
            Expression::Literal(Literal::Array(items)) => {
                items.iter().for_each(|item| item.collect_properties(out));
            }
            Expression::Literal(Literal::Object(entries)) => {
                entries.values().for_each(|item| item.collect_properties(out));
            }
            Expression::Literal(_) => {}
            Expression::Property(property) => {
                if !out.iter().any(|p| p == property.path()) {
                    out.push(property.path().to_string());
                }
            }
            Expression::Arithmetic(arith) => {
                arith.left.collect_properties(out);
                arith.right.collect_properties(out);
            }
            Expression::Boolean(b) => b.collect_properties(out),
        }
    }

    /// Path of a bare property reference
    pub fn as_property(&self) -> Option<&str> {
        match self {
            Expression::Property(property) => Some(property.path()),
            _ => None,
        }
    }

    /// Value of a boolean, number or string literal. These are the only
    /// literals usable to bound an index scan.
    pub fn as_scalar_literal(&self) -> Option<Value> {
        match self {
            Expression::Literal(Literal::Number(n)) => Some(Value::Number(*n)),
            Expression::Literal(Literal::String(s)) => Some(Value::String(s.clone())),
            Expression::Boolean(BooleanExpression::Literal(b)) => Some(Value::Bool(*b)),
            _ => None,
        }
    }
}

impl From<BooleanExpression> for Expression {
    fn from(b: BooleanExpression) -> Self {
        Expression::Boolean(b)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Number(n) => write!(f, "{}", Value::Number(*n)),
            Literal::String(s) => write!(f, "{}", Value::String(s.clone())),
            Literal::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Literal::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", Value::String(key.clone()), item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Property(property) => write!(f, "{}", property.path()),
            Expression::Arithmetic(arith) => write!(
                f,
                "({} {} {})",
                arith.left,
                arith.operator.symbol(),
                arith.right
            ),
            Expression::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        Value::from(json!({
            "name": "will",
            "age": 39,
            "address": {"city": "Mountain View"}
        }))
    }

    #[test]
    fn test_arithmetic() {
        let d = doc();
        let ctx = Context::new(&d);

        let cases = [
            (Expression::plus(Expression::number(1.0), Expression::number(2.0)), Value::Number(3.0)),
            (Expression::minus(Expression::property("age"), Expression::number(9.0)), Value::Number(30.0)),
            (Expression::multiply(Expression::number(2.5), Expression::number(4.0)), Value::Number(10.0)),
            (Expression::divide(Expression::number(9.0), Expression::number(2.0)), Value::Number(4.5)),
            (
                Expression::plus(Expression::property("name"), Expression::string("!")),
                Value::from("will!"),
            ),
        ];

        for (expr, expected) in cases {
            assert_eq!(expr.evaluate(&ctx).unwrap(), expected, "{}", expr);
        }
    }

    #[test]
    fn test_mismatched_arithmetic_is_inapplicable() {
        let d = doc();
        let ctx = Context::new(&d);

        let mismatches = [
            Expression::plus(Expression::property("name"), Expression::number(1.0)),
            Expression::minus(Expression::string("a"), Expression::string("b")),
            Expression::multiply(Expression::null(), Expression::number(2.0)),
            Expression::divide(Expression::boolean(true), Expression::number(2.0)),
        ];

        for expr in mismatches {
            assert_eq!(expr.evaluate(&ctx).unwrap(), Value::Null, "{}", expr);
        }
    }

    #[test]
    fn test_division_by_zero_is_ieee() {
        let d = Value::Null;
        let ctx = Context::new(&d);

        let pos = Expression::divide(Expression::number(1.0), Expression::number(0.0));
        let neg = Expression::divide(Expression::number(-1.0), Expression::number(0.0));
        let nan = Expression::divide(Expression::number(0.0), Expression::number(0.0));

        assert_eq!(pos.evaluate(&ctx).unwrap(), Value::Number(f64::INFINITY));
        assert_eq!(neg.evaluate(&ctx).unwrap(), Value::Number(f64::NEG_INFINITY));
        assert!(nan.evaluate(&ctx).unwrap().as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_container_literals() {
        let d = doc();
        let ctx = Context::new(&d);

        let expr = Expression::object(vec![
            ("who", Expression::property("name")),
            (
                "pair",
                Expression::array(vec![Expression::number(1.0), Expression::property("age")]),
            ),
        ]);

        assert_eq!(
            expr.evaluate(&ctx).unwrap(),
            Value::from(json!({"who": "will", "pair": [1, 39]}))
        );
    }

    #[test]
    fn test_container_child_failure_aborts() {
        let d = doc();
        let ctx = Context::new(&d);

        let expr = Expression::array(vec![
            Expression::number(1.0),
            Expression::property("name.first"),
        ]);
        assert!(expr.evaluate(&ctx).is_err());
    }

    #[test]
    fn test_from_value_round_trip() {
        let d = Value::Null;
        let ctx = Context::new(&d);
        let value = Value::from(json!({"a": [1, "x", null, true], "b": {"c": false}}));
        assert_eq!(Expression::from_value(&value).evaluate(&ctx).unwrap(), value);
    }

    #[test]
    fn test_referenced_properties() {
        let expr = Expression::plus(
            Expression::property("a"),
            Expression::array(vec![Expression::property("b"), Expression::property("a")]),
        );
        assert_eq!(expr.referenced_properties(), vec!["a".to_string(), "b".to_string()]);
        assert!(Expression::number(1.0).referenced_properties().is_empty());
    }

    #[test]
    fn test_display() {
        let expr = Expression::plus(Expression::property("age"), Expression::number(1.0));
        assert_eq!(expr.to_string(), "(age + 1)");
        assert_eq!(Expression::string("x").to_string(), "\"x\"");
    }
}
