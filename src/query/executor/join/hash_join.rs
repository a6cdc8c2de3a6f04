// Hash Join Executor Implementation
//
// Build phase: drain the left child into a hash table keyed by the left
// join key expression, storing each left tuple's values. Probe phase:
// pull right tuples, look up their key, and walk the cached match list
// with a bucket cursor. Exactly one output per (right tuple, matching
// left tuple) pair, in probe order.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::catalog::value::{CmpBool, Value};
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::HashJoinPlan;
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::Tuple;

/// Join key wrapper: equality is typed value comparison, hashing goes
/// through the value's stable hash.
#[derive(Debug, Clone)]
struct HashJoinKey {
    value: Value,
}

impl PartialEq for HashJoinKey {
    fn eq(&self, other: &Self) -> bool {
        self.value.compare_equals(&other.value) == CmpBool::True
    }
}

impl Eq for HashJoinKey {}

impl Hash for HashJoinKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

pub struct HashJoinExecutor {
    #[allow(dead_code)]
    ctx: Arc<ExecutorContext>,
    plan: Arc<HashJoinPlan>,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    hash_table: HashMap<HashJoinKey, Vec<Vec<Value>>>,
    built: bool,
    /// Left-value lists matching the current right tuple
    bucket_list: Vec<Vec<Value>>,
    bucket_index: usize,
    right_tuple: Option<Tuple>,
}

impl HashJoinExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<HashJoinPlan>,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            ctx,
            plan,
            left,
            right,
            hash_table: HashMap::new(),
            built: false,
            bucket_list: Vec::new(),
            bucket_index: 0,
            right_tuple: None,
        }
    }

    fn build(&mut self) -> QueryResult<()> {
        while let Some(left_tuple) = self.left.next()? {
            let key = self
                .plan
                .left_key
                .evaluate(&left_tuple, self.left.output_schema())?;
            self.hash_table
                .entry(HashJoinKey { value: key })
                .or_default()
                .push(left_tuple.values().to_vec());
        }
        self.built = true;
        Ok(())
    }
}

impl Executor for HashJoinExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.left.init()?;
        self.right.init()?;
        if !self.built {
            self.build()?;
        }
        self.bucket_list.clear();
        self.bucket_index = 0;
        self.right_tuple = None;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        loop {
            if self.bucket_index < self.bucket_list.len() {
                let left_tuple = Tuple::new(self.bucket_list[self.bucket_index].clone());
                self.bucket_index += 1;
                let right_tuple = self.right_tuple.clone().ok_or_else(|| {
                    QueryError::ExecutionError("probe cursor without a right tuple".to_string())
                })?;

                let values = self
                    .plan
                    .output_exprs
                    .iter()
                    .map(|expr| {
                        expr.evaluate_join(
                            &left_tuple,
                            self.left.output_schema(),
                            &right_tuple,
                            self.right.output_schema(),
                        )
                    })
                    .collect::<QueryResult<Vec<_>>>()?;
                return Ok(Some(Tuple::new(values)));
            }

            // Current match list exhausted: probe with the next right tuple
            match self.right.next()? {
                Some(right_tuple) => {
                    let key = self
                        .plan
                        .right_key
                        .evaluate(&right_tuple, self.right.output_schema())?;
                    if let Some(matches) = self.hash_table.get(&HashJoinKey { value: key }) {
                        self.bucket_list = matches.clone();
                        self.bucket_index = 0;
                        self.right_tuple = Some(right_tuple);
                    }
                }
                None => return Ok(None),
            }
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
