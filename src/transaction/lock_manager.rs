// Lock Manager Implementation
//
// Row-level two-phase locking with WOUND-WAIT deadlock prevention. Every
// manipulation of queue structure happens under one global latch; a
// waiter sleeps on its queue's condition variable, which releases the
// latch. Wake-ups are always broadcast so a wounded waiter can observe
// its own Aborted state.
//
// Wound-wait: before waiting, a transaction aborts every *younger*
// granted holder in the queue (smaller id = older, older wins). A waiter
// therefore only ever waits on older transactions, which rules out
// wait-for cycles.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::common::types::{Rid, TxnId};
use crate::transaction::transaction::{
    AbortReason, IsolationLevel, Transaction, TransactionAbortError, TransactionState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct LockRequest {
    txn_id: TxnId,
    mode: LockMode,
    granted: bool,
}

impl LockRequest {
    fn new(txn_id: TxnId, mode: LockMode) -> Self {
        Self {
            txn_id,
            mode,
            granted: false,
        }
    }
}

#[derive(Default)]
struct LockRequestQueue {
    /// Requests in arrival order
    requests: VecDeque<LockRequest>,
    /// Number of granted shared holders
    sharing_count: usize,
    /// An exclusive request is granted
    is_writing: bool,
    /// At most one upgrade may be in flight per queue
    upgrading: bool,
    /// Waiters sleep here; always notified with a broadcast
    cv: Arc<Condvar>,
}

impl LockRequestQueue {
    fn request_position(&self, txn_id: TxnId) -> Option<usize> {
        self.requests.iter().position(|r| r.txn_id == txn_id)
    }
}

#[derive(Default)]
struct LockTable {
    queues: HashMap<Rid, LockRequestQueue>,
    /// Wounding only knows the victim's id; resolve it here
    id_to_txn: HashMap<TxnId, Arc<Transaction>>,
}

impl LockTable {
    /// Abort every *granted* request younger than `waiter_id` and revoke
    /// its grant: the queue entry goes away, the counters are restored,
    /// and the victim's lock set forgets the rid. Wounded *waiters* are
    /// not touched here; they observe their Aborted state on wake.
    fn wound_younger(&mut self, waiter_id: TxnId, rid: Rid) {
        let queue = match self.queues.get_mut(&rid) {
            Some(queue) => queue,
            None => return,
        };
        let mut wounded: Vec<(TxnId, LockMode)> = Vec::new();
        queue.requests.retain(|request| {
            if request.granted && request.txn_id > waiter_id {
                wounded.push((request.txn_id, request.mode));
                false
            } else {
                true
            }
        });
        for &(_, mode) in &wounded {
            match mode {
                LockMode::Shared => queue.sharing_count -= 1,
                LockMode::Exclusive => queue.is_writing = false,
            }
        }
        for (txn_id, mode) in wounded {
            log::debug!("transaction {} wounds younger transaction {}", waiter_id, txn_id);
            if let Some(victim) = self.id_to_txn.get(&txn_id) {
                victim.set_state(TransactionState::Aborted);
                match mode {
                    LockMode::Shared => {
                        victim.shared_lock_set().lock().remove(&rid);
                    }
                    LockMode::Exclusive => {
                        victim.exclusive_lock_set().lock().remove(&rid);
                    }
                }
            }
        }
    }
}

/// Process-wide lock manager: constructed once at database open.
#[derive(Default)]
pub struct LockManager {
    latch: Mutex<LockTable>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock on `rid`, blocking while a writer holds it.
    pub fn lock_shared(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<(), TransactionAbortError> {
        let mut table = self.latch.lock();
        check_not_shrinking(txn)?;
        if txn.isolation_level() == IsolationLevel::ReadUncommitted {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError {
                txn_id: txn.id(),
                reason: AbortReason::LockSharedOnReadUncommitted,
            });
        }

        let queue = table.queues.entry(rid).or_default();
        queue
            .requests
            .push_back(LockRequest::new(txn.id(), LockMode::Shared));

        if queue.is_writing {
            table.wound_younger(txn.id(), rid);
            let cv = Arc::clone(&table.queues[&rid].cv);
            while txn.state() != TransactionState::Aborted && table.queues[&rid].is_writing {
                cv.wait(&mut table);
            }
        }
        check_aborted(&mut table, txn, rid)?;

        let queue = match table.queues.get_mut(&rid) {
            Some(queue) => queue,
            None => return Ok(()),
        };
        if let Some(pos) = queue.request_position(txn.id()) {
            queue.requests[pos].granted = true;
        }
        queue.sharing_count += 1;
        txn.shared_lock_set().lock().insert(rid);
        table.id_to_txn.insert(txn.id(), Arc::clone(txn));
        Ok(())
    }

    /// Acquire an exclusive lock on `rid`, blocking while any other
    /// transaction holds it in either mode.
    pub fn lock_exclusive(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<(), TransactionAbortError> {
        let mut table = self.latch.lock();
        check_not_shrinking(txn)?;

        let queue = table.queues.entry(rid).or_default();
        queue
            .requests
            .push_back(LockRequest::new(txn.id(), LockMode::Exclusive));

        if queue.is_writing || queue.sharing_count > 0 {
            table.wound_younger(txn.id(), rid);
            let cv = Arc::clone(&table.queues[&rid].cv);
            while txn.state() != TransactionState::Aborted
                && (table.queues[&rid].is_writing || table.queues[&rid].sharing_count > 0)
            {
                cv.wait(&mut table);
            }
        }
        check_aborted(&mut table, txn, rid)?;

        let queue = match table.queues.get_mut(&rid) {
            Some(queue) => queue,
            None => return Ok(()),
        };
        if let Some(pos) = queue.request_position(txn.id()) {
            queue.requests[pos].granted = true;
        }
        queue.is_writing = true;
        txn.exclusive_lock_set().lock().insert(rid);
        table.id_to_txn.insert(txn.id(), Arc::clone(txn));
        Ok(())
    }

    /// Upgrade a held shared lock to exclusive. Only one upgrade may be
    /// pending per rid; a second one aborts with UpgradeConflict.
    pub fn lock_upgrade(
        &self,
        txn: &Arc<Transaction>,
        rid: Rid,
    ) -> Result<(), TransactionAbortError> {
        let mut table = self.latch.lock();
        check_not_shrinking(txn)?;

        let queue = table
            .queues
            .get_mut(&rid)
            .expect("lock_upgrade requires a shared lock held on rid");
        if queue.upgrading {
            txn.set_state(TransactionState::Aborted);
            return Err(TransactionAbortError {
                txn_id: txn.id(),
                reason: AbortReason::UpgradeConflict,
            });
        }

        // Give up the shared grant and rewrite the request in place
        txn.shared_lock_set().lock().remove(&rid);
        queue.sharing_count -= 1;
        if let Some(pos) = queue.request_position(txn.id()) {
            queue.requests[pos].mode = LockMode::Exclusive;
            queue.requests[pos].granted = false;
        }

        if queue.is_writing || queue.sharing_count > 0 {
            table.wound_younger(txn.id(), rid);
            let queue = match table.queues.get_mut(&rid) {
                Some(queue) => queue,
                None => return Ok(()),
            };
            queue.upgrading = true;
            let cv = Arc::clone(&queue.cv);
            while txn.state() != TransactionState::Aborted
                && (table.queues[&rid].is_writing || table.queues[&rid].sharing_count > 0)
            {
                cv.wait(&mut table);
            }
        }
        check_aborted(&mut table, txn, rid)?;

        let queue = match table.queues.get_mut(&rid) {
            Some(queue) => queue,
            None => return Ok(()),
        };
        queue.upgrading = false;
        queue.is_writing = true;
        if let Some(pos) = queue.request_position(txn.id()) {
            queue.requests[pos].granted = true;
        }
        txn.exclusive_lock_set().lock().insert(rid);
        Ok(())
    }

    /// Release the lock held on `rid`. The first release of a lock that
    /// is not (shared ∧ READ COMMITTED) moves a growing transaction into
    /// its shrinking phase.
    pub fn unlock(&self, txn: &Arc<Transaction>, rid: Rid) -> bool {
        let mut table = self.latch.lock();
        txn.shared_lock_set().lock().remove(&rid);
        txn.exclusive_lock_set().lock().remove(&rid);

        let queue = match table.queues.get_mut(&rid) {
            Some(queue) => queue,
            None => return false,
        };
        let request = match queue.request_position(txn.id()) {
            Some(pos) => match queue.requests.remove(pos) {
                Some(request) => request,
                None => return false,
            },
            None => return false,
        };

        if txn.state() == TransactionState::Growing
            && !(request.mode == LockMode::Shared
                && txn.isolation_level() == IsolationLevel::ReadCommitted)
        {
            txn.set_state(TransactionState::Shrinking);
        }

        if request.granted {
            match request.mode {
                LockMode::Shared => {
                    queue.sharing_count -= 1;
                    if queue.sharing_count == 0 {
                        queue.cv.notify_all();
                    }
                }
                LockMode::Exclusive => {
                    queue.is_writing = false;
                    queue.cv.notify_all();
                }
            }
        } else {
            // An ungranted request changes no counters; wake waiters anyway
            queue.cv.notify_all();
        }
        true
    }

    /// Drop the id directory entry of a finished transaction.
    pub fn purge_txn(&self, txn_id: TxnId) {
        self.latch.lock().id_to_txn.remove(&txn_id);
    }

    #[cfg(test)]
    fn queue_stats(&self, rid: Rid) -> Option<(usize, usize, bool)> {
        let table = self.latch.lock();
        table
            .queues
            .get(&rid)
            .map(|q| (q.requests.len(), q.sharing_count, q.is_writing))
    }
}

fn check_not_shrinking(txn: &Transaction) -> Result<(), TransactionAbortError> {
    if txn.state() == TransactionState::Shrinking {
        txn.set_state(TransactionState::Aborted);
        return Err(TransactionAbortError {
            txn_id: txn.id(),
            reason: AbortReason::LockOnShrinking,
        });
    }
    Ok(())
}

/// Aborted is absorbing: a pending acquire of an aborted transaction
/// removes its request and surfaces Deadlock, whether or not it waited.
fn check_aborted(
    table: &mut LockTable,
    txn: &Transaction,
    rid: Rid,
) -> Result<(), TransactionAbortError> {
    if txn.state() == TransactionState::Aborted {
        if let Some(queue) = table.queues.get_mut(&rid) {
            if let Some(pos) = queue.request_position(txn.id()) {
                queue.requests.remove(pos);
            }
        }
        return Err(TransactionAbortError {
            txn_id: txn.id(),
            reason: AbortReason::Deadlock,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: TxnId, isolation: IsolationLevel) -> Arc<Transaction> {
        Arc::new(Transaction::new(id, isolation))
    }

    #[test]
    fn test_shared_then_shared_coexist() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let t2 = txn(2, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);

        lm.lock_shared(&t1, rid).unwrap();
        lm.lock_shared(&t2, rid).unwrap();
        assert!(t1.is_shared_locked(rid));
        assert!(t2.is_shared_locked(rid));
        assert_eq!(lm.queue_stats(rid), Some((2, 2, false)));
    }

    #[test]
    fn test_lock_on_shrinking_aborts() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let r1 = Rid::new(0, 0);
        let r2 = Rid::new(0, 1);

        lm.lock_shared(&t1, r1).unwrap();
        lm.unlock(&t1, r1);
        assert_eq!(t1.state(), TransactionState::Shrinking);

        let err = lm.lock_shared(&t1, r2).unwrap_err();
        assert_eq!(err.reason, AbortReason::LockOnShrinking);
        assert_eq!(t1.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_shared_under_read_uncommitted_aborts() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::ReadUncommitted);
        let err = lm.lock_shared(&t1, Rid::new(0, 0)).unwrap_err();
        assert_eq!(err.reason, AbortReason::LockSharedOnReadUncommitted);
        assert_eq!(t1.state(), TransactionState::Aborted);
    }

    #[test]
    fn test_exclusive_under_read_uncommitted_is_allowed() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::ReadUncommitted);
        let rid = Rid::new(0, 0);
        lm.lock_exclusive(&t1, rid).unwrap();
        assert!(t1.is_exclusive_locked(rid));
    }

    #[test]
    fn test_read_committed_shared_unlock_stays_growing() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::ReadCommitted);
        let rid = Rid::new(0, 0);

        lm.lock_shared(&t1, rid).unwrap();
        lm.unlock(&t1, rid);
        assert_eq!(t1.state(), TransactionState::Growing);

        // A second acquire is still legal
        lm.lock_shared(&t1, rid).unwrap();
    }

    #[test]
    fn test_older_wounds_younger_writer() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let t2 = txn(2, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);

        lm.lock_exclusive(&t2, rid).unwrap();
        // The older transaction does not wait: it wounds t2 and proceeds
        lm.lock_shared(&t1, rid).unwrap();

        assert_eq!(t2.state(), TransactionState::Aborted);
        assert!(t1.is_shared_locked(rid));
    }

    #[test]
    fn test_wounded_transaction_surfaces_deadlock() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let t2 = txn(2, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);
        let other = Rid::new(0, 1);

        lm.lock_exclusive(&t2, rid).unwrap();
        lm.lock_shared(&t1, rid).unwrap();
        assert_eq!(t2.state(), TransactionState::Aborted);

        // The victim's next acquire fails, even without a conflict
        let err = lm.lock_exclusive(&t2, other).unwrap_err();
        assert_eq!(err.reason, AbortReason::Deadlock);
    }

    #[test]
    fn test_younger_waits_for_older() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::time::Duration;

        let lm = Arc::new(LockManager::new());
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let t2 = txn(2, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);

        lm.lock_exclusive(&t1, rid).unwrap();

        let acquired = Arc::new(AtomicBool::new(false));
        let handle = {
            let lm = Arc::clone(&lm);
            let t2 = Arc::clone(&t2);
            let acquired = Arc::clone(&acquired);
            std::thread::spawn(move || {
                lm.lock_exclusive(&t2, rid).unwrap();
                acquired.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!acquired.load(Ordering::SeqCst));
        assert_eq!(t1.state(), TransactionState::Growing);

        lm.unlock(&t1, rid);
        handle.join().unwrap();
        assert!(acquired.load(Ordering::SeqCst));
        assert!(t2.is_exclusive_locked(rid));
    }

    #[test]
    fn test_upgrade_conflict() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let t2 = txn(2, IsolationLevel::RepeatableRead);
        let t3 = txn(3, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);

        lm.lock_shared(&t1, rid).unwrap();
        lm.lock_shared(&t2, rid).unwrap();
        lm.lock_shared(&t3, rid).unwrap();

        // t2 starts an upgrade and must wait on the other shared holders
        let lm = Arc::new(lm);
        let handle = {
            let lm = Arc::clone(&lm);
            let t2 = Arc::clone(&t2);
            std::thread::spawn(move || lm.lock_upgrade(&t2, rid))
        };
        // Let t2 reach its wait; its wound pass aborts t3 (younger) but
        // not t1 (older)
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(t3.state(), TransactionState::Aborted);

        // A second concurrent upgrade aborts immediately
        let err = lm.lock_upgrade(&t1, rid).unwrap_err();
        assert_eq!(err.reason, AbortReason::UpgradeConflict);
        assert_eq!(t1.state(), TransactionState::Aborted);

        // With t1 and t3 gone, t2's upgrade completes
        lm.unlock(&t1, rid);
        lm.unlock(&t3, rid);
        handle.join().unwrap().unwrap();
        assert!(t2.is_exclusive_locked(rid));
    }

    #[test]
    fn test_unlock_transitions_to_shrinking_under_repeatable_read() {
        let lm = LockManager::new();
        let t1 = txn(1, IsolationLevel::RepeatableRead);
        let rid = Rid::new(0, 0);

        lm.lock_exclusive(&t1, rid).unwrap();
        lm.unlock(&t1, rid);
        assert_eq!(t1.state(), TransactionState::Shrinking);
    }
}
