// Expression Implementation
//
// Expression trees evaluated by the executors. Three evaluation forms
// exist: against a single tuple, against a joined (left, right) pair,
// and against an aggregation's (group keys, aggregate values) row.

use crate::catalog::schema::Schema;
use crate::catalog::value::{CmpBool, Value};
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::Tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal value
    Constant(Value),
    /// A column of an input tuple; `tuple_idx` picks the join side
    /// (0 = left / only input, 1 = right)
    ColumnValue { tuple_idx: usize, col_idx: usize },
    /// A comparison between two sub-expressions
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// A term of an aggregation output: either the i-th group-by key or
    /// the i-th aggregate value
    AggregateValue { term_idx: usize, group_by_term: bool },
}

impl Expression {
    pub fn constant(value: Value) -> Self {
        Expression::Constant(value)
    }

    pub fn column(col_idx: usize) -> Self {
        Expression::ColumnValue {
            tuple_idx: 0,
            col_idx,
        }
    }

    pub fn join_column(tuple_idx: usize, col_idx: usize) -> Self {
        Expression::ColumnValue { tuple_idx, col_idx }
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn group_by_term(term_idx: usize) -> Self {
        Expression::AggregateValue {
            term_idx,
            group_by_term: true,
        }
    }

    pub fn aggregate_term(term_idx: usize) -> Self {
        Expression::AggregateValue {
            term_idx,
            group_by_term: false,
        }
    }

    /// Evaluate against a single tuple.
    pub fn evaluate(&self, tuple: &Tuple, schema: &Schema) -> QueryResult<Value> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::ColumnValue { col_idx, .. } => {
                if *col_idx >= schema.column_count() {
                    return Err(QueryError::ColumnNotFound(format!(
                        "ordinal {} out of range",
                        col_idx
                    )));
                }
                Ok(tuple.value(*col_idx).clone())
            }
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate(tuple, schema)?;
                let r = right.evaluate(tuple, schema)?;
                Ok(compare_values(*op, &l, &r))
            }
            Expression::AggregateValue { .. } => Err(QueryError::ExecutionError(
                "aggregate expression outside aggregation context".to_string(),
            )),
        }
    }

    /// Evaluate against a joined pair of tuples.
    pub fn evaluate_join(
        &self,
        left_tuple: &Tuple,
        left_schema: &Schema,
        right_tuple: &Tuple,
        right_schema: &Schema,
    ) -> QueryResult<Value> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::ColumnValue { tuple_idx, col_idx } => {
                let (tuple, schema) = if *tuple_idx == 0 {
                    (left_tuple, left_schema)
                } else {
                    (right_tuple, right_schema)
                };
                if *col_idx >= schema.column_count() {
                    return Err(QueryError::ColumnNotFound(format!(
                        "ordinal {} out of range",
                        col_idx
                    )));
                }
                Ok(tuple.value(*col_idx).clone())
            }
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate_join(left_tuple, left_schema, right_tuple, right_schema)?;
                let r = right.evaluate_join(left_tuple, left_schema, right_tuple, right_schema)?;
                Ok(compare_values(*op, &l, &r))
            }
            Expression::AggregateValue { .. } => Err(QueryError::ExecutionError(
                "aggregate expression outside aggregation context".to_string(),
            )),
        }
    }

    /// Evaluate against one aggregation group.
    pub fn evaluate_aggregate(
        &self,
        group_bys: &[Value],
        aggregates: &[Value],
    ) -> QueryResult<Value> {
        match self {
            Expression::Constant(value) => Ok(value.clone()),
            Expression::AggregateValue {
                term_idx,
                group_by_term,
            } => {
                let terms = if *group_by_term { group_bys } else { aggregates };
                terms.get(*term_idx).cloned().ok_or_else(|| {
                    QueryError::ExecutionError(format!(
                        "aggregate term {} out of range",
                        term_idx
                    ))
                })
            }
            Expression::Comparison { op, left, right } => {
                let l = left.evaluate_aggregate(group_bys, aggregates)?;
                let r = right.evaluate_aggregate(group_bys, aggregates)?;
                Ok(compare_values(*op, &l, &r))
            }
            Expression::ColumnValue { .. } => Err(QueryError::ExecutionError(
                "column expression inside aggregation context".to_string(),
            )),
        }
    }
}

/// Comparisons involving NULL yield NULL, which predicates treat as
/// false.
fn compare_values(op: ComparisonOp, left: &Value, right: &Value) -> Value {
    match op {
        ComparisonOp::Equal => match left.compare_equals(right) {
            CmpBool::True => Value::Boolean(true),
            CmpBool::False => Value::Boolean(false),
            CmpBool::Null => Value::Null,
        },
        ComparisonOp::NotEqual => match left.compare_equals(right) {
            CmpBool::True => Value::Boolean(false),
            CmpBool::False => Value::Boolean(true),
            CmpBool::Null => Value::Null,
        },
        ComparisonOp::LessThan
        | ComparisonOp::LessThanOrEqual
        | ComparisonOp::GreaterThan
        | ComparisonOp::GreaterThanOrEqual => match left.partial_cmp(right) {
            None => Value::Null,
            Some(ordering) => {
                let holds = match op {
                    ComparisonOp::LessThan => ordering.is_lt(),
                    ComparisonOp::LessThanOrEqual => ordering.is_le(),
                    ComparisonOp::GreaterThan => ordering.is_gt(),
                    ComparisonOp::GreaterThanOrEqual => ordering.is_ge(),
                    ComparisonOp::Equal | ComparisonOp::NotEqual => unreachable!(),
                };
                Value::Boolean(holds)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::column::Column;
    use crate::catalog::schema::DataType;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("score", DataType::Integer),
        ])
    }

    #[test]
    fn test_column_and_constant() {
        let tuple = Tuple::new(vec![Value::Integer(1), Value::Integer(50)]);
        let expr = Expression::column(1);
        assert_eq!(expr.evaluate(&tuple, &schema()).unwrap(), Value::Integer(50));

        let expr = Expression::constant(Value::Boolean(true));
        assert_eq!(
            expr.evaluate(&tuple, &schema()).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_comparison_predicate() {
        let tuple = Tuple::new(vec![Value::Integer(1), Value::Integer(50)]);
        let expr = Expression::comparison(
            ComparisonOp::GreaterThan,
            Expression::column(1),
            Expression::constant(Value::Integer(40)),
        );
        assert!(expr.evaluate(&tuple, &schema()).unwrap().is_true());

        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::column(0),
            Expression::constant(Value::Integer(2)),
        );
        assert!(!expr.evaluate(&tuple, &schema()).unwrap().is_true());
    }

    #[test]
    fn test_null_comparison_is_not_true() {
        let tuple = Tuple::new(vec![Value::Null, Value::Integer(50)]);
        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::column(0),
            Expression::constant(Value::Integer(1)),
        );
        let value = expr.evaluate(&tuple, &schema()).unwrap();
        assert_eq!(value, Value::Null);
        assert!(!value.is_true());
    }

    #[test]
    fn test_evaluate_join_picks_sides() {
        let left = Tuple::new(vec![Value::Integer(1)]);
        let right = Tuple::new(vec![Value::Integer(2)]);
        let left_schema = Schema::new(vec![Column::new("a", DataType::Integer)]);
        let right_schema = Schema::new(vec![Column::new("b", DataType::Integer)]);

        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::join_column(0, 0),
            Expression::join_column(1, 0),
        );
        assert!(!expr
            .evaluate_join(&left, &left_schema, &right, &right_schema)
            .unwrap()
            .is_true());

        let same = Tuple::new(vec![Value::Integer(1)]);
        assert!(expr
            .evaluate_join(&left, &left_schema, &same, &right_schema)
            .unwrap()
            .is_true());
    }

    #[test]
    fn test_evaluate_aggregate_terms() {
        let group_bys = vec![Value::Integer(1)];
        let aggregates = vec![Value::Integer(30)];

        assert_eq!(
            Expression::group_by_term(0)
                .evaluate_aggregate(&group_bys, &aggregates)
                .unwrap(),
            Value::Integer(1)
        );
        let having = Expression::comparison(
            ComparisonOp::GreaterThan,
            Expression::aggregate_term(0),
            Expression::constant(Value::Integer(15)),
        );
        assert!(having
            .evaluate_aggregate(&group_bys, &aggregates)
            .unwrap()
            .is_true());
    }
}
