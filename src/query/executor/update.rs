// Update Executor Implementation
//
// Pulls tuples from its child, rewrites them per the plan's update
// infos, writes them back in place, and refreshes every index key
// (delete old, insert new) whether or not the key columns changed.

use std::sync::Arc;

use crate::catalog::value::Value;
use crate::catalog::{IndexInfo, TableInfo};
use crate::catalog::schema::Schema;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::{UpdatePlan, UpdateType};
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::Tuple;

pub struct UpdateExecutor {
    ctx: Arc<ExecutorContext>,
    plan: Arc<UpdatePlan>,
    child: Box<dyn Executor>,
    table_info: Arc<TableInfo>,
    index_infos: Vec<Arc<IndexInfo>>,
}

impl UpdateExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<UpdatePlan>,
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

    fn generate_updated_tuple(&self, src: &Tuple) -> QueryResult<Tuple> {
        let col_count = self.table_info.schema.column_count();
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            let old = src.value(idx);
            match self.plan.update_attrs.get(&idx) {
                None => values.push(old.clone()),
                Some(info) => match info.update_type {
                    UpdateType::Add => values.push(old.add(&Value::Integer(info.value))?),
                    UpdateType::Set => values.push(Value::Integer(info.value)),
                },
            }
        }
        Ok(Tuple::new(values))
    }
}

impl Executor for UpdateExecutor {
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
            .ok_or_else(|| QueryError::ExecutionError("update input without rid".to_string()))?;

        let txn = self.ctx.txn();
        if txn.is_shared_locked(rid) {
            self.ctx.lock_manager().lock_upgrade(txn, rid)?;
        } else if !txn.is_exclusive_locked(rid) {
            self.ctx.lock_manager().lock_exclusive(txn, rid)?;
        }

        let mut updated = self.generate_updated_tuple(&tuple)?;
        if !self.table_info.table.update_tuple(&updated, rid, txn) {
            return Err(QueryError::ExecutionError(format!(
                "no live tuple to update at {}",
                rid
            )));
        }
        updated.set_rid(rid);

        for index_info in &self.index_infos {
            let old_key = tuple.key_from_tuple(
                &self.table_info.schema,
                &index_info.key_schema,
                &index_info.key_attrs,
            );
            let new_key = updated.key_from_tuple(
                &self.table_info.schema,
                &index_info.key_schema,
                &index_info.key_attrs,
            );
            index_info.index.delete_entry(&old_key, rid, txn)?;
            index_info.index.insert_entry(&new_key, rid, txn)?;
        }
        Ok(Some(updated))
    }

    fn output_schema(&self) -> &Schema {
        &self.table_info.schema
    }
}
