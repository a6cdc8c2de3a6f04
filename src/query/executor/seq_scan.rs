// Sequential Scan Executor Implementation
//
// Walks a table heap and emits the tuples passing the plan's predicate,
// projected onto the output schema. Output columns are resolved against
// the base schema by name once, at construction. Row locks follow the
// transaction's isolation level: no shared locks under READ UNCOMMITTED,
// lock-read-release under READ COMMITTED, lock and hold under
// REPEATABLE READ.

use std::sync::Arc;

use crate::catalog::TableInfo;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::SeqScanPlan;
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::{TableIterator, Tuple};
use crate::catalog::schema::Schema;
use crate::transaction::IsolationLevel;

pub struct SeqScanExecutor {
    ctx: Arc<ExecutorContext>,
    plan: Arc<SeqScanPlan>,
    table_info: Arc<TableInfo>,
    /// For each output column, its ordinal in the base table schema
    out_schema_idx: Vec<usize>,
    iter: Option<TableIterator>,
}

impl SeqScanExecutor {
    pub fn new(ctx: Arc<ExecutorContext>, plan: Arc<SeqScanPlan>) -> QueryResult<Self> {
        let table_info = ctx
            .catalog()
            .table(plan.table_oid)
            .ok_or_else(|| QueryError::TableNotFound(format!("oid {}", plan.table_oid)))?;

        let mut out_schema_idx = Vec::with_capacity(plan.output_schema.column_count());
        for column in plan.output_schema.columns() {
            let idx = table_info
                .schema
                .column_index(column.name())
                .ok_or_else(|| QueryError::ColumnNotFound(column.name().to_string()))?;
            out_schema_idx.push(idx);
        }

        Ok(Self {
            ctx,
            plan,
            table_info,
            out_schema_idx,
            iter: None,
        })
    }
}

impl Executor for SeqScanExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.iter = Some(self.table_info.table.iter(self.ctx.txn()));
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        let iter = self
            .iter
            .as_mut()
            .ok_or_else(|| QueryError::ExecutionError("executor not initialized".to_string()))?;

        while let Some(tuple) = iter.next()? {
            let rid = tuple
                .rid()
                .ok_or_else(|| QueryError::ExecutionError("heap tuple without rid".to_string()))?;

            let txn = self.ctx.txn();
            let isolation = txn.isolation_level();
            let mut locked_here = false;
            if isolation != IsolationLevel::ReadUncommitted
                && !txn.is_shared_locked(rid)
                && !txn.is_exclusive_locked(rid)
            {
                self.ctx.lock_manager().lock_shared(txn, rid)?;
                locked_here = true;
            }

            let passes = match &self.plan.predicate {
                Some(predicate) => predicate
                    .evaluate(&tuple, &self.table_info.schema)?
                    .is_true(),
                None => true,
            };

            let projected = if passes {
                let values = self
                    .out_schema_idx
                    .iter()
                    .map(|&i| tuple.value(i).clone())
                    .collect();
                Some(Tuple::with_rid(values, rid))
            } else {
                None
            };

            // Under READ COMMITTED a shared lock only covers the read
            if locked_here && isolation == IsolationLevel::ReadCommitted {
                self.ctx.lock_manager().unlock(txn, rid);
            }

            if let Some(tuple) = projected {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn output_schema(&self) -> &Schema {
        &self.plan.output_schema
    }
}
