// Distinct Executor Implementation
//
// Streams its child and emits each distinct row once. The dedup key is
// every output column of the child's schema; equality is typed value
// equality.

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::catalog::value::Value;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::DistinctPlan;
use crate::query::result::QueryResult;
use crate::storage::table::Tuple;

pub struct DistinctExecutor {
    #[allow(dead_code)]
    ctx: Arc<ExecutorContext>,
    #[allow(dead_code)]
    plan: Arc<DistinctPlan>,
    child: Box<dyn Executor>,
    seen: HashSet<Vec<Value>>,
}

impl DistinctExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: Arc<DistinctPlan>, child: Box<dyn Executor>) -> Self {
        Self {
            ctx,
            plan,
            child,
            seen: HashSet::new(),
        }
    }
}

impl Executor for DistinctExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()?;
        self.seen.clear();
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            let key: Vec<Value> = tuple.values().to_vec();
            if self.seen.insert(key) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        self.child.output_schema()
    }
}
