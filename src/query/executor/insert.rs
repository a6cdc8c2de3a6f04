// Insert Executor Implementation
//
// Inserts rows into a table heap and keeps every index on the table in
// step. Two modes: raw inserts walk the plan's embedded rows with an
// internal cursor, select-driven inserts pull from the child until it
// exhausts.

use std::sync::Arc;

use crate::catalog::{IndexInfo, TableInfo};
use crate::catalog::schema::Schema;
use crate::query::executor::{Executor, ExecutorContext};
use crate::query::plan::{InsertPlan, InsertSource};
use crate::query::result::{QueryError, QueryResult};
use crate::storage::table::Tuple;

pub struct InsertExecutor {
    ctx: Arc<ExecutorContext>,
    plan: Arc<InsertPlan>,
    child: Option<Box<dyn Executor>>,
    table_info: Arc<TableInfo>,
    index_infos: Vec<Arc<IndexInfo>>,
    /// Cursor over the raw rows, raw mode only
    insert_cursor: usize,
}

impl InsertExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        plan: Arc<InsertPlan>,
        child: Option<Box<dyn Executor>>,
    ) -> QueryResult<Self> {
        let table_info = ctx
            .catalog()
            .table(plan.table_oid)
            .ok_or_else(|| QueryError::TableNotFound(format!("oid {}", plan.table_oid)))?;
        let index_infos = ctx.catalog().table_indexes(&table_info.name);

        if plan.is_raw_insert() == child.is_some() {
            return Err(QueryError::ExecutionError(
                "insert plan source does not match child executor".to_string(),
            ));
        }

        Ok(Self {
            ctx,
            plan,
            child,
            table_info,
            index_infos,
            insert_cursor: 0,
        })
    }

    fn next_input(&mut self) -> QueryResult<Option<Tuple>> {
        match &self.plan.source {
            InsertSource::Raw(rows) => {
                if self.insert_cursor == rows.len() {
                    return Ok(None);
                }
                let values = rows[self.insert_cursor].clone();
                self.insert_cursor += 1;
                Ok(Some(Tuple::new(values)))
            }
            InsertSource::Child => match &mut self.child {
                Some(child) => child.next(),
                None => Ok(None),
            },
        }
    }
}

impl Executor for InsertExecutor {
    fn init(&mut self) -> QueryResult<()> {
        self.insert_cursor = 0;
        if let Some(child) = &mut self.child {
            child.init()?;
        }
        Ok(())
    }

    fn next(&mut self) -> QueryResult<Option<Tuple>> {
        let mut tuple = match self.next_input()? {
            Some(tuple) => tuple,
            None => return Ok(None),
        };

        let txn = self.ctx.txn();
        let rid = self.table_info.table.insert_tuple(&tuple, txn)?;
        tuple.set_rid(rid);
        self.ctx.lock_manager().lock_exclusive(txn, rid)?;

        for index_info in &self.index_infos {
            let key = tuple.key_from_tuple(
                &self.table_info.schema,
                &index_info.key_schema,
                &index_info.key_attrs,
            );
            index_info.index.insert_entry(&key, rid, txn)?;
        }
        Ok(Some(tuple))
    }

    fn output_schema(&self) -> &Schema {
        &self.table_info.schema
    }
}
