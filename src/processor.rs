mod locking;
mod occ;
mod parallel_occ;
mod pool;
mod serial;

use crate::error::Error;
use crate::lock::{ExclusiveLockManager, LockManager, SharedLockManager};
use crate::storage::Storage;
use crate::transaction::{Transaction, TxnStatus};
use crate::types::TxnId;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use pool::{WorkerPool, QUEUE_COUNT, THREAD_COUNT};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Concurrency-control protocol run by a [`TxnProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// One transaction at a time on the scheduler thread.
    Serial,
    /// Two-phase locking where every lock is exclusive.
    LockingExclusive,
    /// Two-phase locking with shared and exclusive locks.
    Locking,
    /// Optimistic concurrency control, validated serially on the scheduler.
    Occ,
    /// Optimistic concurrency control with parallel validation.
    ParallelOcc,
}

impl Protocol {
    pub const ALL: [Protocol; 5] = [
        Protocol::Serial,
        Protocol::LockingExclusive,
        Protocol::Locking,
        Protocol::Occ,
        Protocol::ParallelOcc,
    ];
}

/// State shared between the client handle, the scheduler thread, and the
/// worker pool. Mode-specific state (lock manager, parked transactions, the
/// active set) lives on the scheduler thread alone.
struct Shared {
    storage: Storage,
    requests_tx: Sender<Transaction>,
    requests_rx: Receiver<Transaction>,
    completed_tx: Sender<Transaction>,
    completed_rx: Receiver<Transaction>,
    validated_tx: Sender<(Transaction, bool)>,
    validated_rx: Receiver<(Transaction, bool)>,
    results_tx: Sender<Transaction>,
    next_unique_id: Mutex<TxnId>,
    pool: WorkerPool,
}

impl Shared {
    /// Admission path shared by clients and OCC re-admission: stamps a fresh
    /// unique id and enqueues the transaction. The mutex is held across the
    /// send so id order matches queue order per submitter.
    fn admit(&self, mut txn: Transaction) -> Result<(), Error> {
        let mut next_unique_id = self.next_unique_id.lock();
        txn.unique_id = *next_unique_id;
        *next_unique_id += 1;
        self.requests_tx.send(txn).map_err(|_| Error::Shutdown)
    }

    /// Captures reads for every key in the read and write sets, then runs the
    /// transaction body against them.
    fn run_body(&self, txn: &mut Transaction) {
        txn.reads.clear();
        txn.writes.clear();
        for key in txn.readset.union(&txn.writeset) {
            if let Some(value) = self.storage.read(*key) {
                txn.reads.insert(*key, value);
            }
        }
        txn.run();
    }

    /// Unit of work dispatched onto the pool by the concurrent schedulers:
    /// execute the body, then hand the transaction back through the completed
    /// queue.
    fn execute_txn(&self, mut txn: Transaction) {
        self.run_body(&mut txn);
        let _ = self.completed_tx.send(txn);
    }

    /// Flushes buffered writes to storage (stamping each key's write time) and
    /// marks the transaction committed.
    fn apply_writes(&self, txn: &mut Transaction) {
        for (key, value) in &txn.writes {
            self.storage.write(*key, *value);
        }
        txn.status = TxnStatus::Committed;
    }

    /// Commits or aborts a finished body and returns it to the client.
    fn finalize(&self, mut txn: Transaction) {
        match txn.status {
            TxnStatus::CompletedCommit => self.apply_writes(&mut txn),
            TxnStatus::CompletedAbort => txn.status = TxnStatus::Aborted,
            status => panic!(
                "completed transaction {} has invalid status {:?}",
                txn.unique_id, status
            ),
        }
        let _ = self.results_tx.send(txn);
    }
}

/// Entry point of the dedicated scheduler thread. Exactly one loop runs for
/// the configured protocol.
fn run_scheduler(protocol: Protocol, shared: &Arc<Shared>) {
    match protocol {
        Protocol::Serial => serial::run(shared),
        Protocol::LockingExclusive | Protocol::Locking => {
            let (ready_tx, ready_rx) = unbounded();
            let lock_manager: Box<dyn LockManager> = match protocol {
                Protocol::LockingExclusive => {
                    Box::new(ExclusiveLockManager::new(ready_tx.clone()))
                }
                _ => Box::new(SharedLockManager::new(ready_tx.clone())),
            };
            locking::run(shared, lock_manager, ready_tx, ready_rx);
        }
        Protocol::Occ => occ::run(shared),
        Protocol::ParallelOcc => parallel_occ::run(shared),
    }
}

/// Pluggable in-memory transaction processor.
///
/// Clients submit transactions and collect them back, in completion order,
/// once they reach a terminal status. A dedicated scheduler thread owns
/// admission and commit; transaction bodies run on a fixed worker pool
/// (except under [`Protocol::Serial`]).
pub struct TxnProcessor {
    shared: Arc<Shared>,
    results_rx: Receiver<Transaction>,
    scheduler: Option<JoinHandle<()>>,
}

impl TxnProcessor {
    /// Builds a processor with the default pool size.
    pub fn new(protocol: Protocol) -> TxnProcessor {
        TxnProcessor::with_pool(protocol, THREAD_COUNT, QUEUE_COUNT)
    }

    /// Builds a processor with `threads` workers pulling from `queues` task
    /// sub-queues.
    pub fn with_pool(protocol: Protocol, threads: usize, queues: usize) -> TxnProcessor {
        let (requests_tx, requests_rx) = unbounded();
        let (completed_tx, completed_rx) = unbounded();
        let (validated_tx, validated_rx) = unbounded();
        let (results_tx, results_rx) = unbounded();
        let shared = Arc::new(Shared {
            storage: Storage::new(),
            requests_tx,
            requests_rx,
            completed_tx,
            completed_rx,
            validated_tx,
            validated_rx,
            results_tx,
            next_unique_id: Mutex::new(1),
            pool: WorkerPool::new(threads, queues),
        });

        debug!(?protocol, threads, queues, "starting transaction processor");
        let scheduler = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("lockstep-scheduler".into())
                .spawn(move || run_scheduler(protocol, &shared))
                .expect("failed to spawn scheduler thread")
        };

        TxnProcessor {
            shared,
            results_rx,
            scheduler: Some(scheduler),
        }
    }

    /// Admits a transaction, transferring ownership to the processor until it
    /// comes back through [`get_txn_result`](TxnProcessor::get_txn_result).
    pub fn submit(&self, txn: Transaction) -> Result<(), Error> {
        self.shared.admit(txn)
    }

    /// Blocks until some transaction reaches a terminal status and returns it.
    /// Results arrive in completion order, not admission order.
    pub fn get_txn_result(&self) -> Result<Transaction, Error> {
        self.results_rx.recv().map_err(|_| Error::Shutdown)
    }
}

impl Drop for TxnProcessor {
    fn drop(&mut self) {
        self.shared.pool.shutdown();
        if let Some(scheduler) = self.scheduler.take() {
            let _ = scheduler.join();
        }
    }
}
