use super::Shared;
use crate::lock::LockManager;
use crate::transaction::Transaction;
use crate::types::TxnId;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::hint;
use std::sync::Arc;
use tracing::trace;

/// LOCKING: strict two-phase locking over either lock manager variant.
///
/// The growing phase happens entirely here, before dispatch: every lock is
/// requested on admission, in key order, and a transaction runs only once the
/// lock manager reports its last request granted. Releases happen only after
/// the body has finished, so the granted transactions are pairwise
/// lock-compatible at every instant.
pub(super) fn run(
    shared: &Arc<Shared>,
    mut lock_manager: Box<dyn LockManager>,
    ready_tx: Sender<TxnId>,
    ready_rx: Receiver<TxnId>,
) {
    // Transactions parked while some of their lock requests are still queued.
    let mut parked: HashMap<TxnId, Transaction> = HashMap::new();

    while shared.pool.active() {
        let mut idle = true;

        // Growing phase for the next request: one lock per key, exclusive when
        // the key is written. A key in both sets gets a single exclusive
        // request, keeping the per-key queues free of duplicates.
        if let Ok(txn) = shared.requests_rx.try_recv() {
            idle = false;
            let id = txn.unique_id;
            let mut blocked = 0;
            for key in txn.readset.union(&txn.writeset) {
                let granted = if txn.writeset.contains(key) {
                    lock_manager.write_lock(id, *key)
                } else {
                    lock_manager.read_lock(id, *key)
                };
                if !granted {
                    blocked += 1;
                }
            }
            parked.insert(id, txn);
            if blocked == 0 {
                let _ = ready_tx.send(id);
            } else {
                trace!(txn = id, blocked, "waiting for locks");
            }
        }

        // Shrinking phase: release everything a finished body held, then
        // commit or abort it.
        while let Ok(txn) = shared.completed_rx.try_recv() {
            idle = false;
            for key in txn.readset.union(&txn.writeset) {
                lock_manager.release(txn.unique_id, *key);
            }
            shared.finalize(txn);
        }

        // Dispatch every transaction whose last lock was just granted.
        while let Ok(id) = ready_rx.try_recv() {
            idle = false;
            if let Some(txn) = parked.remove(&id) {
                let task_shared = Arc::clone(shared);
                shared
                    .pool
                    .submit(Box::new(move || task_shared.execute_txn(txn)));
            }
        }

        if idle {
            hint::spin_loop();
        }
    }
}
