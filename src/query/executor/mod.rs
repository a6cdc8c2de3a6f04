// Query Executor Module
//
// Iterator-model executors: init() resets an executor and its children,
// next() produces one tuple per call until exhaustion. Executors own
// their children and share their plan node through an Arc.

mod aggregation;
mod delete;
mod distinct;
mod insert;
mod join;
mod seq_scan;
mod update;

pub use aggregation::{AggregationExecutor, AggregationHashTable};
pub use delete::DeleteExecutor;
pub use distinct::DistinctExecutor;
pub use insert::InsertExecutor;
pub use join::{HashJoinExecutor, NestedLoopJoinExecutor};
pub use seq_scan::SeqScanExecutor;
pub use update::UpdateExecutor;

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::catalog::schema::Schema;
use crate::query::result::QueryResult;
use crate::storage::table::Tuple;
use crate::transaction::{LockManager, Transaction};

/// The uniform iterator contract all executors implement.
pub trait Executor {
    /// Reset this executor and its children.
    fn init(&mut self) -> QueryResult<()>;

    /// Produce the next tuple, or None on exhaustion. Tuples that come
    /// from a heap carry their record id.
    fn next(&mut self) -> QueryResult<Option<Tuple>>;

    /// The schema of the tuples this executor produces.
    fn output_schema(&self) -> &Schema;
}

/// Everything an executor needs from its surroundings.
pub struct ExecutorContext {
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    txn: Arc<Transaction>,
}

impl ExecutorContext {
    pub fn new(
        catalog: Arc<Catalog>,
        lock_manager: Arc<LockManager>,
        txn: Arc<Transaction>,
    ) -> Self {
        Self {
            catalog,
            lock_manager,
            txn,
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    pub fn txn(&self) -> &Arc<Transaction> {
        &self.txn
    }
}
