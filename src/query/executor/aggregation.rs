// Aggregation Executor Implementation
//
// Eagerly drains its child into a hash aggregation table keyed by the
// group-by values, then iterates the groups, filters them through the
// HAVING clause, and projects the output expressions.

use std::sync::Arc;

use linked_hash_map::LinkedHashMap;

use crate::catalog::schema::Schema;
use crate::catalog::value::Value;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::{AggregationPlan, AggregationType};
use crate::query::result::QueryResult;
use crate::storage::table::Tuple;

/// Hash table folding input rows into per-group aggregate values.
/// Insertion order is preserved so output order follows first sighting
/// of each group.
pub struct AggregationHashTable {
    groups: LinkedHashMap<Vec<Value>, Vec<Value>>,
    agg_types: Vec<AggregationType>,
}

impl AggregationHashTable {
    pub fn new(agg_types: Vec<AggregationType>) -> Self {
        Self {
            groups: LinkedHashMap::new(),
            agg_types,
        }
    }

    /// Identity element per aggregate kind: counts and sums start at
    /// zero, min/max start undefined.
    fn initial_values(agg_types: &[AggregationType]) -> Vec<Value> {
        agg_types
            .iter()
            .map(|agg_type| match agg_type {
                AggregationType::Count => Value::Integer(0),
                AggregationType::Sum => Value::Integer(0),
                AggregationType::Min | AggregationType::Max => Value::Null,
            })
            .collect()
    }

    /// Initialize the group on first sight, then fold `input` in.
    pub fn insert_combine(&mut self, key: Vec<Value>, input: Vec<Value>) -> QueryResult<()> {
        let initial = Self::initial_values(&self.agg_types);
        let entry = self.groups.entry(key).or_insert(initial);

        for (i, agg_type) in self.agg_types.iter().enumerate() {
            match agg_type {
                AggregationType::Count => {
                    entry[i] = entry[i].add(&Value::Integer(1))?;
                }
                AggregationType::Sum => {
                    entry[i] = entry[i].add(&input[i])?;
                }
                AggregationType::Min => {
                    let replace = entry[i].is_null()
                        || matches!(input[i].partial_cmp(&entry[i]), Some(std::cmp::Ordering::Less));
                    if replace && !input[i].is_null() {
                        entry[i] = input[i].clone();
                    }
                }
                AggregationType::Max => {
                    let replace = entry[i].is_null()
                        || matches!(
                            input[i].partial_cmp(&entry[i]),
                            Some(std::cmp::Ordering::Greater)
                        );
                    if replace && !input[i].is_null() {
                        entry[i] = input[i].clone();
                    }
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<Value>, &Vec<Value>)> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct AggregationExecutor {
    #[allow(dead_code)]
    ctx: Arc<ExecutorContext>,
    plan: Arc<AggregationPlan>,
    child: Box<dyn Executor>,
    table: AggregationHashTable,
    built: bool,
    results: Option<std::vec::IntoIter<Tuple>>,
}

impl AggregationExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<AggregationPlan>,
        child: Box<dyn Executor>,
    ) -> Self {
        let table = AggregationHashTable::new(plan.agg_types.clone());
        Self {
            ctx,
            plan,
            child,
            table,
            built: false,
            results: None,
        }
    }

    fn build(&mut self) -> QueryResult<()> {
        while let Some(tuple) = self.child.next()? {
            let schema = self.child.output_schema();
            let key = self
                .plan
                .group_by_exprs
                .iter()
                .map(|expr| expr.evaluate(&tuple, schema))
                .collect::<QueryResult<Vec<_>>>()?;
            let input = self
                .plan
                .aggregate_exprs
                .iter()
                .map(|expr| expr.evaluate(&tuple, schema))
                .collect::<QueryResult<Vec<_>>>()?;
            self.table.insert_combine(key, input)?;
        }
        self.built = true;
        Ok(())
    }
}

impl Executor for AggregationExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()?;
        if !self.built {
            self.build()?;
        }
        self.results = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        if self.results.is_none() {
            if !self.built {
                self.build()?;
            }
            let mut rows = Vec::new();
            for (group_bys, aggregates) in self.table.iter() {
                if let Some(having) = &self.plan.having {
                    if !having.evaluate_aggregate(group_bys, aggregates)?.is_true() {
                        continue;
                    }
                }
                let values = self
                    .plan
                    .output_exprs
                    .iter()
                    .map(|expr| expr.evaluate_aggregate(group_bys, aggregates))
                    .collect::<QueryResult<Vec<_>>>()?;
                rows.push(Tuple::new(values));
            }
            self.results = Some(rows.into_iter());
        }
        Ok(self.results.as_mut().and_then(|iter| iter.next()))
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
