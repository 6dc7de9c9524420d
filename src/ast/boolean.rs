//! Boolean algebra
//!
//! [`BooleanExpression`] adds to plain evaluation:
//!
//! - negation normal form ([`BooleanExpression::nnf`])
//! - conjunctive normal form ([`BooleanExpression::cnf`]), valid only on an
//!   NNF tree
//! - decomposition of a CNF tree into boolean factors
//! - sargability of comparisons
//! - selectivity estimates driven by path statistics
//!
//! Comparisons between values of different kinds are inapplicable and
//! evaluate to `false` for every comparator.

use std::cmp::Ordering;
use std::fmt;

use super::context::Context;
use super::expression::{EvalResult, Expression};
use crate::stats::PathStatsMap;
use crate::value::{collate, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Neq => "!=",
        }
    }

    /// Parses the operator names used by the JSON statement format
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gt" => Some(ComparisonOperator::Gt),
            "gte" => Some(ComparisonOperator::Gte),
            "lt" => Some(ComparisonOperator::Lt),
            "lte" => Some(ComparisonOperator::Lte),
            "eq" => Some(ComparisonOperator::Eq),
            "neq" => Some(ComparisonOperator::Neq),
            _ => None,
        }
    }

    /// Operator with its operands swapped: `a < b` iff `b > a`
    pub fn flip(&self) -> Self {
        match self {
            ComparisonOperator::Gt => ComparisonOperator::Lt,
            ComparisonOperator::Gte => ComparisonOperator::Lte,
            ComparisonOperator::Lt => ComparisonOperator::Gt,
            ComparisonOperator::Lte => ComparisonOperator::Gte,
            ComparisonOperator::Eq => ComparisonOperator::Eq,
            ComparisonOperator::Neq => ComparisonOperator::Neq,
        }
    }

    /// Selectivity assumed when no statistics are available
    pub fn prior_selectivity(&self) -> f64 {
        match self {
            ComparisonOperator::Gt
            | ComparisonOperator::Gte
            | ComparisonOperator::Lt
            | ComparisonOperator::Lte => 1.0 / 3.0,
            ComparisonOperator::Eq => 1.0 / 10.0,
            ComparisonOperator::Neq => 9.0 / 10.0,
        }
    }

    fn test(&self, ord: Ordering) -> bool {
        match self {
            ComparisonOperator::Gt => ord == Ordering::Greater,
            ComparisonOperator::Gte => ord != Ordering::Less,
            ComparisonOperator::Lt => ord == Ordering::Less,
            ComparisonOperator::Lte => ord != Ordering::Greater,
            ComparisonOperator::Eq => ord == Ordering::Equal,
            ComparisonOperator::Neq => ord != Ordering::Equal,
        }
    }
}

/// Binary comparison between two expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    operator: ComparisonOperator,
    left: Box<Expression>,
    right: Box<Expression>,
}

impl Comparison {
    pub fn new(operator: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Self {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn left(&self) -> &Expression {
        &self.left
    }

    pub fn right(&self) -> &Expression {
        &self.right
    }

    pub fn evaluate(&self, ctx: &Context<'_>) -> EvalResult<bool> {
        let left = self.left.evaluate(ctx)?;
        let right = self.right.evaluate(ctx)?;
        if left.kind() != right.kind() {
            return Ok(false);
        }
        Ok(self.operator.test(collate(&left, &right)))
    }

    /// Exactly one side is a property and the other a boolean, number or
    /// string literal
    pub fn is_sargable(&self) -> bool {
        self.sarg_parts().is_some()
    }

    pub fn sarg_property(&self) -> Option<&str> {
        self.sarg_parts().map(|(path, _, _)| path)
    }

    pub fn sarg_value(&self) -> Option<Value> {
        self.sarg_parts().map(|(_, value, _)| value)
    }

    /// Operator oriented as `property <op> value`
    pub fn sarg_operator(&self) -> Option<ComparisonOperator> {
        self.sarg_parts().map(|(_, _, op)| op)
    }

    fn sarg_parts(&self) -> Option<(&str, Value, ComparisonOperator)> {
        match (
            self.left.as_property(),
            self.right.as_property(),
            self.left.as_scalar_literal(),
            self.right.as_scalar_literal(),
        ) {
            (Some(path), None, None, Some(value)) => Some((path, value, self.operator)),
            (None, Some(path), Some(value), None) => Some((path, value, self.operator.flip())),
            _ => None,
        }
    }

    fn selectivity(&self, stats: &PathStatsMap) -> f64 {
        let prior = self.operator.prior_selectivity();
        let Some((path, value, operator)) = self.sarg_parts() else {
            return prior;
        };
        let Some(path_stats) = stats.get(path) else {
            return prior;
        };
        if path_stats.rows <= 0 {
            return prior;
        }

        let rows = path_stats.rows as f64;
        let estimate = match operator {
            ComparisonOperator::Eq => path_stats.rows_with_value(&value),
            ComparisonOperator::Neq => path_stats.rows_without_value(&value),
            ComparisonOperator::Lt => path_stats.rows_less_than(&value),
            ComparisonOperator::Gt => path_stats.rows_greater_than(&value),
            ComparisonOperator::Lte => path_stats
                .rows_less_than(&value)
                .zip(path_stats.rows_with_value(&value))
                .map(|(less, equal)| (less + equal).min(rows)),
            ComparisonOperator::Gte => path_stats
                .rows_greater_than(&value)
                .zip(path_stats.rows_with_value(&value))
                .map(|(greater, equal)| (greater + equal).min(rows)),
        };

        estimate
            .map(|matching| (matching / rows).clamp(0.0, 1.0))
            .unwrap_or(prior)
    }
}

/// Boolean-valued expression
#[derive(Debug, Clone, PartialEq)]
pub enum BooleanExpression {
    Literal(bool),
    Comparison(Comparison),
    And(Vec<BooleanExpression>),
    Or(Vec<BooleanExpression>),
    Not(Box<BooleanExpression>),
}

impl BooleanExpression {
    pub fn literal(b: bool) -> Self {
        BooleanExpression::Literal(b)
    }

    pub fn compare(operator: ComparisonOperator, left: Expression, right: Expression) -> Self {
        BooleanExpression::Comparison(Comparison::new(operator, left, right))
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Gt, left, right)
    }

    pub fn gte(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Gte, left, right)
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Lt, left, right)
    }

    pub fn lte(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Lte, left, right)
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Eq, left, right)
    }

    pub fn neq(left: Expression, right: Expression) -> Self {
        Self::compare(ComparisonOperator::Neq, left, right)
    }

    pub fn and(operands: Vec<BooleanExpression>) -> Self {
        BooleanExpression::And(operands)
    }

    pub fn or(operands: Vec<BooleanExpression>) -> Self {
        BooleanExpression::Or(operands)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: BooleanExpression) -> Self {
        BooleanExpression::Not(Box::new(operand))
    }

    /// Evaluates to a boolean. `And`/`Or` short-circuit left to right.
    pub fn evaluate_boolean(&self, ctx: &Context<'_>) -> EvalResult<bool> {
        match self {
            BooleanExpression::Literal(b) => Ok(*b),
            BooleanExpression::Comparison(c) => c.evaluate(ctx),
            BooleanExpression::And(operands) => {
                for operand in operands {
                    if !operand.evaluate_boolean(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            BooleanExpression::Or(operands) => {
                for operand in operands {
                    if operand.evaluate_boolean(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            BooleanExpression::Not(operand) => Ok(!operand.evaluate_boolean(ctx)?),
        }
    }

    /// Generic evaluation; always `Value::Bool` of [`Self::evaluate_boolean`]
    pub fn evaluate(&self, ctx: &Context<'_>) -> EvalResult<Value> {
        self.evaluate_boolean(ctx).map(Value::Bool)
    }

    /// Negation normal form. `Not` ends up only directly above comparisons
    /// and literals. Nesting of `And`/`Or` is left as is.
    pub fn nnf(&self) -> BooleanExpression {
        match self {
            BooleanExpression::Not(operand) => operand.nnf().distribute_not(),
            BooleanExpression::And(operands) => {
                BooleanExpression::And(operands.iter().map(Self::nnf).collect())
            }
            BooleanExpression::Or(operands) => {
                BooleanExpression::Or(operands.iter().map(Self::nnf).collect())
            }
            leaf => leaf.clone(),
        }
    }

    /// Negates an NNF tree, keeping it in NNF
    fn distribute_not(self) -> BooleanExpression {
        match self {
            BooleanExpression::And(operands) => BooleanExpression::Or(
                operands.into_iter().map(Self::distribute_not).collect(),
            ),
            BooleanExpression::Or(operands) => BooleanExpression::And(
                operands.into_iter().map(Self::distribute_not).collect(),
            ),
            BooleanExpression::Not(operand) => *operand,
            leaf => BooleanExpression::Not(Box::new(leaf)),
        }
    }

    /// Conjunctive normal form of an NNF tree.
    ///
    /// Nested `And`s are flattened. An `Or` over `And` branches is
    /// distributed into the cartesian product of the branches, with the
    /// `Or`'s simple operands appended to every product term:
    /// `(a AND b) OR c` becomes `(a OR c) AND (b OR c)`.
    pub fn cnf(&self) -> BooleanExpression {
        match self {
            BooleanExpression::And(operands) => {
                let mut flat = Vec::with_capacity(operands.len());
                for operand in operands {
                    match operand.cnf() {
                        BooleanExpression::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                BooleanExpression::And(flat)
            }
            BooleanExpression::Or(operands) => {
                let mut simple = Vec::new();
                let mut branches = Vec::new();
                for operand in operands {
                    match operand.cnf() {
                        BooleanExpression::Or(inner) => simple.extend(inner),
                        BooleanExpression::And(inner) => branches.push(inner),
                        other => simple.push(other),
                    }
                }
                if branches.is_empty() {
                    return BooleanExpression::Or(simple);
                }

                let mut terms: Vec<Vec<BooleanExpression>> = vec![Vec::new()];
                for branch in &branches {
                    let mut next = Vec::with_capacity(terms.len() * branch.len());
                    for term in &terms {
                        for conjunct in branch {
                            let mut extended = term.clone();
                            match conjunct {
                                BooleanExpression::Or(inner) => extended.extend(inner.iter().cloned()),
                                other => extended.push(other.clone()),
                            }
                            next.push(extended);
                        }
                    }
                    terms = next;
                }

                BooleanExpression::And(
                    terms
                        .into_iter()
                        .map(|mut term| {
                            term.extend(simple.iter().cloned());
                            if term.len() == 1 {
                                term.remove(0)
                            } else {
                                BooleanExpression::Or(term)
                            }
                        })
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }

    /// Conjuncts of a CNF tree; anything but `And` is a single factor
    pub fn boolean_factors(&self) -> Vec<BooleanExpression> {
        match self {
            BooleanExpression::And(operands) => operands.clone(),
            other => vec![other.clone()],
        }
    }

    /// The comparison inside, if this is a comparison
    pub fn as_comparison(&self) -> Option<&Comparison> {
        match self {
            BooleanExpression::Comparison(c) => Some(c),
            _ => None,
        }
    }

    /// Only comparisons are directly sargable
    pub fn is_sargable(&self) -> bool {
        self.as_comparison().map_or(false, Comparison::is_sargable)
    }

    pub fn sarg_property(&self) -> Option<&str> {
        self.as_comparison().and_then(Comparison::sarg_property)
    }

    pub fn sarg_value(&self) -> Option<Value> {
        self.as_comparison().and_then(Comparison::sarg_value)
    }

    /// Estimated fraction of rows that satisfy this expression
    pub fn selectivity(&self, stats: &PathStatsMap) -> f64 {
        match self {
            BooleanExpression::Literal(true) => 1.0,
            BooleanExpression::Literal(false) => 0.0,
            BooleanExpression::Comparison(c) => c.selectivity(stats),
            BooleanExpression::And(operands) => operands
                .iter()
                .map(|operand| operand.selectivity(stats))
                .product(),
            BooleanExpression::Or(operands) => operands.iter().fold(0.0, |acc, operand| {
                let s = operand.selectivity(stats);
                acc + s - acc * s
            }),
            BooleanExpression::Not(operand) => 1.0 - operand.selectivity(stats),
        }
    }

    pub fn referenced_properties(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out
    }

    pub(crate) fn collect_properties(&self, out: &mut Vec<String>) {
        match self {
            BooleanExpression::Literal(_) => {}
            BooleanExpression::Comparison(c) => {
                c.left.collect_properties(out);
                c.right.collect_properties(out);
            }
            BooleanExpression::And(operands) | BooleanExpression::Or(operands) => {
                operands.iter().for_each(|operand| operand.collect_properties(out));
            }
            BooleanExpression::Not(operand) => operand.collect_properties(out),
        }
    }
}

impl fmt::Display for BooleanExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, operands: &[BooleanExpression], word: &str| {
            write!(f, "(")?;
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", word)?;
                }
                write!(f, "{}", operand)?;
            }
            write!(f, ")")
        };

        match self {
            BooleanExpression::Literal(b) => write!(f, "{}", b),
            BooleanExpression::Comparison(c) => {
                write!(f, "({} {} {})", c.left, c.operator.symbol(), c.right)
            }
            BooleanExpression::And(operands) => join(f, operands, "AND"),
            BooleanExpression::Or(operands) => join(f, operands, "OR"),
            BooleanExpression::Not(operand) => write!(f, "NOT {}", operand),
        }
    }
}
