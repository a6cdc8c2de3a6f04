// Shared fixtures for integration tests

use std::sync::Arc;

use anyhow::Result;

use chalkdb::catalog::{Catalog, Column, DataType, Schema, Value};
use chalkdb::query::executor::{Executor, ExecutorContext, InsertExecutor};
use chalkdb::query::plan::{InsertPlan, InsertSource};
use chalkdb::transaction::{IsolationLevel, LockManager, Transaction, TransactionManager};

pub struct TestDb {
    pub catalog: Arc<Catalog>,
    pub lock_manager: Arc<LockManager>,
    pub txn_manager: Arc<TransactionManager>,
}

impl TestDb {
    pub fn new() -> Self {
        let catalog = Arc::new(Catalog::new());
        let lock_manager = Arc::new(LockManager::new());
        let txn_manager = Arc::new(TransactionManager::new(Arc::clone(&lock_manager)));
        Self {
            catalog,
            lock_manager,
            txn_manager,
        }
    }

    pub fn begin(&self, isolation: IsolationLevel) -> Arc<Transaction> {
        self.txn_manager.begin(isolation)
    }

    pub fn context(&self, txn: &Arc<Transaction>) -> Arc<ExecutorContext> {
        Arc::new(ExecutorContext::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.lock_manager),
            Arc::clone(txn),
        ))
    }
}

pub fn users_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", DataType::Integer),
        Column::new("name", DataType::Text),
    ])
}

pub fn metrics_schema() -> Schema {
    Schema::new(vec![
        Column::new("grp", DataType::Integer),
        Column::new("val", DataType::Integer),
    ])
}

/// Create a table and fill it through a raw-mode insert executor.
pub fn create_and_seed(
    db: &TestDb,
    txn: &Arc<Transaction>,
    name: &str,
    schema: Schema,
    rows: Vec<Vec<Value>>,
) -> Result<u32> {
    let info = db.catalog.create_table(name, schema)?;
    let plan = Arc::new(InsertPlan {
        table_oid: info.oid,
        source: InsertSource::Raw(rows),
    });
    let mut insert = InsertExecutor::new(db.context(txn), plan, None)?;
    insert.init()?;
    while insert.next()?.is_some() {}
    Ok(info.oid)
}

/// Drain an executor into a vector of value rows.
pub fn collect(executor: &mut dyn Executor) -> Result<Vec<Vec<Value>>> {
    let mut rows = Vec::new();
    executor.init()?;
    while let Some(tuple) = executor.next()? {
        rows.push(tuple.values().to_vec());
    }
    Ok(rows)
}

pub fn int(v: i64) -> Value {
    Value::Integer(v)
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
