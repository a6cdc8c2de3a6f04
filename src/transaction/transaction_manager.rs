// Transaction Manager Implementation
//
// Creates transactions with monotonically increasing ids (smaller id =
// older transaction) and finishes them: commit and abort both hand every
// held lock back to the lock manager and drop the transaction from the
// id directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::TxnId;
use crate::transaction::lock_manager::LockManager;
use crate::transaction::transaction::{IsolationLevel, Transaction, TransactionState};

#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction {0} is already committed or aborted")]
    InvalidState(TxnId),
}

pub struct TransactionManager {
    next_txn_id: AtomicU32,
    lock_manager: Arc<LockManager>,
    active_transactions: Mutex<HashMap<TxnId, Arc<Transaction>>>,
}

impl TransactionManager {
    pub fn new(lock_manager: Arc<LockManager>) -> Self {
        Self {
            next_txn_id: AtomicU32::new(1),
            lock_manager,
            active_transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Begin a new transaction.
    pub fn begin(&self, isolation_level: IsolationLevel) -> Arc<Transaction> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst);
        let txn = Arc::new(Transaction::new(txn_id, isolation_level));
        self.active_transactions
            .lock()
            .insert(txn_id, Arc::clone(&txn));
        txn
    }

    /// Commit: release all locks, then enter the terminal state.
    pub fn commit(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        match txn.state() {
            TransactionState::Committed | TransactionState::Aborted => {
                return Err(TransactionError::InvalidState(txn.id()))
            }
            TransactionState::Growing | TransactionState::Shrinking => {}
        }
        self.release_locks(txn);
        txn.set_state(TransactionState::Committed);
        self.finish(txn.id());
        log::debug!("transaction {} committed", txn.id());
        Ok(())
    }

    /// Abort: also the path a wounded transaction's driver must take
    /// after seeing a Deadlock error, so an already-Aborted state is fine.
    pub fn abort(&self, txn: &Arc<Transaction>) -> Result<(), TransactionError> {
        if txn.state() == TransactionState::Committed {
            return Err(TransactionError::InvalidState(txn.id()));
        }
        txn.set_state(TransactionState::Aborted);
        self.release_locks(txn);
        self.finish(txn.id());
        log::debug!("transaction {} aborted", txn.id());
        Ok(())
    }

    pub fn get_transaction(&self, txn_id: TxnId) -> Option<Arc<Transaction>> {
        self.active_transactions.lock().get(&txn_id).cloned()
    }

    fn release_locks(&self, txn: &Arc<Transaction>) {
        for rid in txn.held_locks() {
            self.lock_manager.unlock(txn, rid);
        }
    }

    fn finish(&self, txn_id: TxnId) {
        self.active_transactions.lock().remove(&txn_id);
        self.lock_manager.purge_txn(txn_id);
    }
}
