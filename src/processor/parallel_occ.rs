use super::Shared;
use crate::transaction::{Transaction, TxnStatus};
use crate::types::{wall_clock, Key, TxnId};
use std::collections::{BTreeSet, HashMap};
use std::hint;
use std::sync::Arc;
use tracing::trace;

/// Completed and validated transactions drained per scheduler iteration.
const VALIDATION_BATCH: usize = 200;

/// Key sets of a transaction currently in the validate-and-apply region,
/// snapshotted by value for the validation tasks so workers never alias the
/// scheduler's active set.
struct ActiveKeys {
    readset: BTreeSet<Key>,
    writeset: BTreeSet<Key>,
}

/// P_OCC: bodies run speculatively as in OCC, but validation itself runs on
/// the worker pool, each task checking against a snapshot of the transactions
/// that entered validation before it.
pub(super) fn run(shared: &Arc<Shared>) {
    let mut active_set: HashMap<TxnId, Arc<ActiveKeys>> = HashMap::new();

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

        // Hand completed bodies to parallel validation, batch-capped.
        for _ in 0..VALIDATION_BATCH {
            let Ok(txn) = shared.completed_rx.try_recv() else {
                break;
            };
            idle = false;
            let snapshot: Vec<Arc<ActiveKeys>> = active_set.values().cloned().collect();
            active_set.insert(
                txn.unique_id,
                Arc::new(ActiveKeys {
                    readset: txn.readset.clone(),
                    writeset: txn.writeset.clone(),
                }),
            );
            let task_shared = Arc::clone(shared);
            shared
                .pool
                .submit(Box::new(move || validate_txn(&task_shared, txn, snapshot)));
        }

        // Commit validated transactions and re-admit the failures, batch-capped.
        for _ in 0..VALIDATION_BATCH {
            let Ok((mut txn, valid)) = shared.validated_rx.try_recv() else {
                break;
            };
            idle = false;
            active_set.remove(&txn.unique_id);
            if valid {
                let _ = shared.results_tx.send(txn);
            } else {
                trace!(txn = txn.unique_id, "validation failed, re-admitting");
                txn.status = TxnStatus::Incomplete;
                let _ = shared.admit(txn);
            }
        }

        if idle {
            hint::spin_loop();
        }
    }
}

/// Validation task run on the worker pool. A passing transaction applies its
/// own writes before reporting back; storage is internally synchronized, so
/// concurrent validators may write at once.
fn validate_txn(shared: &Arc<Shared>, mut txn: Transaction, snapshot: Vec<Arc<ActiveKeys>>) {
    // A body that chose to abort needs no validation and never re-executes.
    if txn.status == TxnStatus::CompletedAbort {
        txn.status = TxnStatus::Aborted;
        let _ = shared.validated_tx.send((txn, true));
        return;
    }
    if txn.status != TxnStatus::CompletedCommit {
        panic!(
            "completed transaction {} has invalid status {:?}",
            txn.unique_id, txn.status
        );
    }

    // Reads must predate any committed overwrite. The write set needs no
    // timestamp check of its own: conflicts with concurrent validators are
    // caught by the active-set intersection below.
    let mut valid = txn
        .readset
        .iter()
        .all(|key| shared.storage.timestamp(*key) <= txn.occ_start_time);

    if valid {
        'snapshot: for other in &snapshot {
            for key in &txn.writeset {
                if other.readset.contains(key) || other.writeset.contains(key) {
                    valid = false;
                    break 'snapshot;
                }
            }
        }
    }

    if valid {
        shared.apply_writes(&mut txn);
    }
    let _ = shared.validated_tx.send((txn, valid));
}
