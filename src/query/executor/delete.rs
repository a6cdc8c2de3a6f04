// Delete Executor Implementation
//
// Pulls rids from its child, tombstones the heap tuple, and removes the
// key from every index on the table. The row lock is upgraded when the
// child's scan already holds it shared.

use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::catalog::schema::Schema;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::DeletePlan;
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::Tuple;

pub struct DeleteExecutor {
    ctx: Arc<ExecutorContext>,
    #[allow(dead_code)]
    plan: Arc<DeletePlan>,
    child: Box<dyn Executor>,
    table_info: Arc<TableInfo>,
    index_infos: Vec<Arc<IndexInfo>>,
}

impl DeleteExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<DeletePlan>,
        child: Box<dyn Executor>,
    ) -> QueryResult<Self> {
        let table_info = ctx
            .catalog()
            .table(plan.table_oid)
            .ok_or_else(|| QueryError::TableNotFound(format!("oid {}", plan.table_oid)))?;
        let index_infos = ctx.catalog().table_indexes(&table_info.name);
        Ok(Self {
            ctx,
            plan,
            child,
            table_info,
            index_infos,
        })
    }
}

impl Executor for DeleteExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.child.init()
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        let tuple = match self.child.next()? {
            Some(tuple) => tuple,
            None => return Ok(None),
        };
        let rid = tuple
            .rid()
            .ok_or_else(|| QueryError::ExecutionError("delete input without rid".to_string()))?;

        let txn = self.ctx.txn();
        if txn.is_shared_locked(rid) {
            self.ctx.lock_manager().lock_upgrade(txn, rid)?;
        } else if !txn.is_exclusive_locked(rid) {
            self.ctx.lock_manager().lock_exclusive(txn, rid)?;
        }

        if !self.table_info.table.mark_delete(rid, txn) {
            return Err(QueryError::ExecutionError(format!(
                "no live tuple to delete at {}",
                rid
            )));
        }

        for index_info in &self.index_infos {
            let key = tuple.key_from_tuple(
                &self.table_info.schema,
                &index_info.key_schema,
                &index_info.key_attrs,
            );
            index_info.index.delete_entry(&key, rid, txn)?;
        }
        Ok(Some(tuple))
    }

    fn output_schema(&self) -> &Schema {
        &self.table_info.schema
    }
}
