//! Filter operator
//!
//! Re-applies every boolean factor to every row. Index ranges only narrow
//! the candidates; they never replace the check.

use futures_util::future::BoxFuture;
use serde_json::{json, Map};
use tokio::sync::mpsc;

use super::operator::{explain_node, output_channel, start_source, Operator, CPU_COST};
use crate::ast::{BooleanExpression, Context};
use crate::observability::{Event, Logger};
use crate::value::Value;

pub struct Filter {
    source: Box<dyn Operator>,
    factors: Vec<BooleanExpression>,
    output: mpsc::Sender<Value>,
    receiver: Option<mpsc::Receiver<Value>>,
}

impl Filter {
    pub fn new(source: Box<dyn Operator>, factors: Vec<BooleanExpression>, capacity: usize) -> Self {
        let (output, receiver) = output_channel(capacity);
        Self {
            source,
            factors,
            output,
            receiver: Some(receiver),
        }
    }

    pub fn factors(&self) -> &[BooleanExpression] {
        &self.factors
    }
}

/// True when every factor holds. Stops at the first false or failing one.
fn accepts(factors: &[BooleanExpression], row: &Value) -> bool {
    if row.as_object().is_none() {
        Logger::warn(
            Event::FactorEvaluationFailed,
            &[("error", "row is not an object"), ("kind", row.kind().as_str())],
        );
        return false;
    }
    let context = Context::new(row);
    for factor in factors {
        match factor.evaluate_boolean(&context) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => {
                Logger::trace(
                    Event::FactorEvaluationFailed,
                    &[("error", &err.to_string()), ("factor", &factor.to_string())],
                );
                return false;
            }
        }
    }
    true
}

impl Operator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn source(&self) -> Option<&dyn Operator> {
        Some(self.source.as_ref())
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<Value>> {
        self.receiver.take()
    }

    fn run(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Filter {
            source,
            factors,
            output,
            ..
        } = *self;
        Box::pin(async move {
            let Some(mut input) = start_source(source) else {
                return;
            };
            while let Some(row) = input.recv().await {
                if !accepts(&factors, &row) {
                    continue;
                }
                if output.send(row).await.is_err() {
                    return;
                }
            }
        })
    }

    fn explain(&self) -> serde_json::Value {
        let mut detail = Map::new();
        let factors: Vec<String> = self.factors.iter().map(ToString::to_string).collect();
        detail.insert("boolean_factors".into(), json!(factors));
        explain_node(self, "filter", detail)
    }

    fn cost(&self) -> f64 {
        self.source.estimated_rows() as f64 * CPU_COST
    }

    /// Passes the source estimate through; the reduction is not modelled
    fn estimated_rows(&self) -> i64 {
        self.source.estimated_rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression;
    use crate::plan::mock::{doc_row, drain, MockOperator};
    use serde_json::json;

    fn people() -> Vec<Value> {
        vec![
            doc_row("1", json!({"name": "will", "age": 39})),
            doc_row("2", json!({"name": "kid", "age": 9})),
            doc_row("3", json!({"name": "anon"})),
            doc_row("4", json!({"name": "nested", "age": {"years": 40}})),
            doc_row("5", json!({"name": "bad", "address": 7})),
        ]
    }

    fn ids(rows: &[Value]) -> Vec<String> {
        rows.iter()
            .map(|r| Context::new(r).get_path("meta.id").unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_filter_keeps_matching_rows() {
        let factors = vec![BooleanExpression::gt(
            Expression::property("doc.age"),
            Expression::number(18.0),
        )];
        let filter = Filter::new(Box::new(MockOperator::new(people())), factors, 4);
        let rows = drain(Box::new(filter)).await;
        // a missing age is null and an object age is a different kind; neither matches
        assert_eq!(ids(&rows), vec!["\"1\""]);
    }

    #[tokio::test]
    async fn test_filter_drops_rows_that_fail_to_evaluate() {
        let factors = vec![
            BooleanExpression::eq(Expression::property("doc.address.city"), Expression::null()),
        ];
        let filter = Filter::new(Box::new(MockOperator::new(people())), factors, 4);
        let rows = drain(Box::new(filter)).await;
        // row 5 fails: address is a number. The others resolve address to
        // null and then fail walking through it.
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_every_factor_must_hold() {
        let factors = vec![
            BooleanExpression::gt(Expression::property("doc.age"), Expression::number(5.0)),
            BooleanExpression::neq(Expression::property("doc.name"), Expression::string("will")),
        ];
        let filter = Filter::new(Box::new(MockOperator::new(people())), factors, 4);
        let rows = drain(Box::new(filter)).await;
        assert_eq!(ids(&rows), vec!["\"2\""]);
    }

    #[tokio::test]
    async fn test_non_object_rows_are_dropped() {
        let rows = vec![Value::from(3.0), doc_row("1", json!({"age": 50}))];
        let filter = Filter::new(
            Box::new(MockOperator::new(rows)),
            vec![BooleanExpression::literal(true)],
            4,
        );
        assert_eq!(drain(Box::new(filter)).await.len(), 1);
    }

    #[test]
    fn test_cost_and_explain() {
        let mock = MockOperator::with_cost(vec![], 10.0).with_estimated_rows(400);
        let factor = BooleanExpression::gt(Expression::property("doc.age"), Expression::number(18.0));
        let filter = Filter::new(Box::new(mock), vec![factor], 4);
        assert_eq!(filter.cost(), 400.0);
        assert_eq!(filter.estimated_rows(), 400);
        assert_eq!(filter.total_cost(), 410.0);

        let explained = filter.explain();
        assert_eq!(explained["type"], "filter");
        assert_eq!(explained["boolean_factors"][0], "(doc.age > 18)");
    }
}
