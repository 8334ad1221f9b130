use super::Shared;
use crate::transaction::TxnStatus;
use crate::types::wall_clock;
use std::hint;
use std::sync::Arc;
use tracing::trace;

/// OCC with serial validation: bodies run speculatively on the pool, and the
/// scheduler validates finished transactions one at a time against the
/// storage write stamps.
pub(super) fn run(shared: &Arc<Shared>) {
    while shared.pool.active() {
        let mut idle = true;

        if let Ok(mut txn) = shared.requests_rx.try_recv() {
            idle = false;
            txn.occ_start_time = wall_clock();
            let task_shared = Arc::clone(shared);
            shared
                .pool
                .submit(Box::new(move || task_shared.execute_txn(txn)));
        }

        while let Ok(mut txn) = shared.completed_rx.try_recv() {
            idle = false;
            // A commit that stamped any key of interest after this transaction
            // started invalidates its reads.
            let valid = txn
                .readset
                .union(&txn.writeset)
                .all(|key| shared.storage.timestamp(*key) <= txn.occ_start_time);

            match txn.status {
                TxnStatus::CompletedCommit if valid => {
                    shared.apply_writes(&mut txn);
                    let _ = shared.results_tx.send(txn);
                }
                TxnStatus::CompletedCommit => {
                    // Retry from scratch with a fresh id and start time. The
                    // client sees nothing until a later attempt terminates.
                    trace!(txn = txn.unique_id, "validation failed, re-admitting");
                    txn.status = TxnStatus::Incomplete;
                    let _ = shared.admit(txn);
                }
                TxnStatus::CompletedAbort => {
                    txn.status = TxnStatus::Aborted;
                    let _ = shared.results_tx.send(txn);
                }
                status => panic!(
                    "completed transaction {} has invalid status {:?}",
                    txn.unique_id, status
                ),
            }
        }

        if idle {
            hint::spin_loop();
        }
    }
}
