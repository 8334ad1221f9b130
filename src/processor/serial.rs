use super::Shared;
use std::hint;
use std::sync::Arc;

/// SERIAL: execute each transaction on the scheduler thread, one at a time,
/// committing in admission order.
pub(super) fn run(shared: &Arc<Shared>) {
    while shared.pool.active() {
        match shared.requests_rx.try_recv() {
            Ok(mut txn) => {
                shared.run_body(&mut txn);
                shared.finalize(txn);
            }
            Err(_) => hint::spin_loop(),
        }
    }
}
