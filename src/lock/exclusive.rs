use super::{LockManager, LockMode, LockRequest, LockState, WaitTable};
use crate::types::{Key, TxnId};
use crossbeam_channel::Sender;
use std::collections::{HashMap, VecDeque};

/// Variant A: every request is exclusive, so at most the front of each per-key
/// queue is granted.
pub struct ExclusiveLockManager {
    lock_table: HashMap<Key, VecDeque<LockRequest>>,
    waits: WaitTable,
}

impl ExclusiveLockManager {
    pub fn new(ready: Sender<TxnId>) -> ExclusiveLockManager {
        ExclusiveLockManager {
            lock_table: HashMap::new(),
            waits: WaitTable::new(ready),
        }
    }

    fn lock(&mut self, txn: TxnId, key: Key) -> bool {
        let queue = self.lock_table.entry(key).or_default();
        queue.push_back(LockRequest {
            mode: LockMode::Exclusive,
            txn,
        });
        if queue.len() == 1 {
            true
        } else {
            self.waits.block(txn);
            false
        }
    }
}

impl LockManager for ExclusiveLockManager {
    fn write_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.lock(txn, key)
    }

    // Reads are indistinguishable from writes in this variant.
    fn read_lock(&mut self, txn: TxnId, key: Key) -> bool {
        self.lock(txn, key)
    }

    fn release(&mut self, txn: TxnId, key: Key) {
        let Some(queue) = self.lock_table.get_mut(&key) else {
            return;
        };
        let Some(pos) = queue.iter().position(|request| request.txn == txn) else {
            return;
        };
        let was_front = pos == 0;
        queue.remove(pos);
        if queue.is_empty() {
            self.lock_table.remove(&key);
            return;
        }
        // Removing the holder passes the lock to the next request in line.
        if was_front {
            if let Some(front) = queue.front() {
                let next = front.txn;
                self.waits.wake(next);
            }
        }
    }

    fn status(&self, key: Key) -> LockState {
        match self.lock_table.get(&key).and_then(|queue| queue.front()) {
            Some(front) => LockState::Exclusive(front.txn),
            None => LockState::Unlocked,
        }
    }
}
