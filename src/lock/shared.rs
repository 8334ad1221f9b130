use super::{LockManager, LockMode, LockRequest, LockState, WaitTable};
use crate::types::{Key, TxnId};
use crossbeam_channel::Sender;
use std::collections::{HashMap, VecDeque};

/// Variant B: shared/exclusive locking. The granted prefix of each per-key
/// queue is either a maximal run of shared requests at the front or a single
/// exclusive request at the front; it is recomputed from the queue contents,
/// never stored.
pub struct SharedLockManager {
    lock_table: HashMap<Key, VecDeque<LockRequest>>,
    waits: WaitTable,
}

/// Number of requests at the front of `queue` that are currently granted.
fn granted_prefix(queue: &VecDeque<LockRequest>) -> usize {
    match queue.front() {
        None => 0,
        Some(front) if front.mode == LockMode::Exclusive => 1,
        Some(_) => queue
            .iter()
            .take_while(|request| request.mode == LockMode::Shared)
            .count(),
    }
}

impl SharedLockManager {
    pub fn new(ready: Sender<TxnId>) -> SharedLockManager {
        SharedLockManager {
            lock_table: HashMap::new(),
            waits: WaitTable::new(ready),
        }
    }
}

impl LockManager for SharedLockManager {
    fn write_lock(&mut self, txn: TxnId, key: Key) -> bool {
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

    fn read_lock(&mut self, txn: TxnId, key: Key) -> bool {
        let queue = self.lock_table.entry(key).or_default();
        // Shared is compatible with everything except an exclusive anywhere
        // ahead of the new entry.
        let blocked = queue
            .iter()
            .any(|request| request.mode == LockMode::Exclusive);
        queue.push_back(LockRequest {
            mode: LockMode::Shared,
            txn,
        });
        if blocked {
            self.waits.block(txn);
            false
        } else {
            true
        }
    }

    fn release(&mut self, txn: TxnId, key: Key) {
        let Some(queue) = self.lock_table.get_mut(&key) else {
            return;
        };
        let Some(pos) = queue.iter().position(|request| request.txn == txn) else {
            return;
        };
        let granted_before = granted_prefix(queue);
        queue.remove(pos);
        if queue.is_empty() {
            self.lock_table.remove(&key);
            return;
        }

        // Wake every request the removal slid into the granted prefix, in
        // queue order. An entry at index i of the shrunk queue sat at index i
        // (ahead of the removed request) or i + 1 (behind it) before.
        let granted_after = granted_prefix(queue);
        for (index, request) in queue.iter().enumerate().take(granted_after) {
            let old_index = if index < pos { index } else { index + 1 };
            if old_index >= granted_before {
                self.waits.wake(request.txn);
            }
        }
    }

    fn status(&self, key: Key) -> LockState {
        let Some(queue) = self.lock_table.get(&key) else {
            return LockState::Unlocked;
        };
        match queue.front() {
            None => LockState::Unlocked,
            Some(front) if front.mode == LockMode::Exclusive => LockState::Exclusive(front.txn),
            Some(_) => LockState::Shared(
                queue
                    .iter()
                    .take_while(|request| request.mode == LockMode::Shared)
                    .map(|request| request.txn)
                    .collect(),
            ),
        }
    }
}
