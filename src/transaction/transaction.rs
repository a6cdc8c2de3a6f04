// Transaction Implementation
//
// A transaction is the logical actor of two-phase locking. State reads
// must be possible from lock-manager wait predicates without extra
// locking, so the state lives in an atomic; writes happen under the lock
// manager's global latch and are followed by a queue broadcast.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{Rid, TxnId};

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
}

/// Two-phase locking lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Growing,
    Shrinking,
    Committed,
    Aborted,
}

impl TransactionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TransactionState::Growing,
            1 => TransactionState::Shrinking,
            2 => TransactionState::Committed,
            3 => TransactionState::Aborted,
            _ => unreachable!("invalid transaction state {}", value),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            TransactionState::Growing => 0,
            TransactionState::Shrinking => 1,
            TransactionState::Committed => 2,
            TransactionState::Aborted => 3,
        }
    }
}

/// Why a lock acquisition aborted its transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    LockOnShrinking,
    LockSharedOnReadUncommitted,
    UpgradeConflict,
    Deadlock,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AbortReason::LockOnShrinking => "lock requested in shrinking phase",
            AbortReason::LockSharedOnReadUncommitted => {
                "shared lock requested under READ UNCOMMITTED"
            }
            AbortReason::UpgradeConflict => "another upgrade is already in progress",
            AbortReason::Deadlock => "wounded by an older transaction",
        };
        write!(f, "{}", s)
    }
}

/// Error surfaced by lock operations; the transaction is already in the
/// Aborted state when this is returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Transaction {txn_id} aborted: {reason}")]
pub struct TransactionAbortError {
    pub txn_id: TxnId,
    pub reason: AbortReason,
}

pub struct Transaction {
    id: TxnId,
    isolation_level: IsolationLevel,
    state: AtomicU8,
    shared_lock_set: Mutex<HashSet<Rid>>,
    exclusive_lock_set: Mutex<HashSet<Rid>>,
}

impl Transaction {
    pub fn new(id: TxnId, isolation_level: IsolationLevel) -> Self {
        Self {
            id,
            isolation_level,
            state: AtomicU8::new(TransactionState::Growing.as_u8()),
            shared_lock_set: Mutex::new(HashSet::new()),
            exclusive_lock_set: Mutex::new(HashSet::new()),
        }
    }

    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn state(&self) -> TransactionState {
        TransactionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: TransactionState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub fn is_shared_locked(&self, rid: Rid) -> bool {
        self.shared_lock_set.lock().contains(&rid)
    }

    pub fn is_exclusive_locked(&self, rid: Rid) -> bool {
        self.exclusive_lock_set.lock().contains(&rid)
    }

    /// Snapshot of every rid this transaction holds a lock on.
    pub fn held_locks(&self) -> Vec<Rid> {
        let mut rids: Vec<Rid> = self.shared_lock_set.lock().iter().copied().collect();
        rids.extend(self.exclusive_lock_set.lock().iter().copied());
        rids
    }

    pub(crate) fn shared_lock_set(&self) -> &Mutex<HashSet<Rid>> {
        &self.shared_lock_set
    }

    pub(crate) fn exclusive_lock_set(&self) -> &Mutex<HashSet<Rid>> {
        &self.exclusive_lock_set
    }
}
