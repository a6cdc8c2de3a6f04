// Nested Loop Join Executor Implementation
//
// The left child is the outer cursor. For each left tuple the right
// child is drained in full and re-initialized; a missing predicate means
// constant TRUE, producing the cross product. Output tuples carry the
// left tuple's rid.

use std::sync::Arc;

use crate::catalog::schema::Schema;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::NestedLoopJoinPlan;
use crate::query::result::QueryResult;
use crate::storage::table::Tuple;

pub struct NestedLoopJoinExecutor {
    #[allow(dead_code)]
    ctx: Arc<ExecutorContext>,
    plan: Arc<NestedLoopJoinPlan>,
    left: Box<dyn Executor>,
    right: Box<dyn Executor>,
    left_tuple: Option<Tuple>,
}

impl NestedLoopJoinExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<NestedLoopJoinPlan>,
        left: Box<dyn Executor>,
        right: Box<dyn Executor>,
    ) -> Self {
        Self {
            ctx,
            plan,
            left,
            right,
            left_tuple: None,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.left.init()?;
        self.right.init()?;
        self.left_tuple = self.left.next()?;
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        loop {
            let left_tuple = match &self.left_tuple {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };

            while let Some(right_tuple) = self.right.next()? {
                let passes = match &self.plan.predicate {
                    Some(predicate) => predicate
                        .evaluate_join(
                            &left_tuple,
                            self.left.output_schema(),
                            &right_tuple,
                            self.right.output_schema(),
                        )?
                        .is_true(),
                    None => true,
                };
                if !passes {
                    continue;
                }

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

                let mut joined = Tuple::new(values);
                if let Some(rid) = left_tuple.rid() {
                    joined.set_rid(rid);
                }
                return Ok(Some(joined));
            }

            // Right side exhausted: rewind it and advance the outer cursor
            self.right.init()?;
            self.left_tuple = self.left.next()?;
        }
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
