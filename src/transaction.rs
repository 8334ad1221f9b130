use crate::types::{Key, Timestamp, TxnId, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::thread;
use std::time::Duration;

/// Lifecycle states of a transaction.
///
/// `CompletedCommit` and `CompletedAbort` mean the body finished with an
/// intended commit or abort; `Committed` and `Aborted` are the terminal states
/// set by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Not yet executed, or re-admitted after a failed OCC validation.
    Incomplete,
    /// The body finished and intends to commit.
    CompletedCommit,
    /// The body finished and intends to abort.
    CompletedAbort,
    /// Terminal: writes were applied to storage.
    Committed,
    /// Terminal: the transaction made no changes.
    Aborted,
}

/// Program logic of a transaction.
///
/// The body must be deterministic given the reads it observes: OCC re-executes
/// failed transactions from scratch against fresh reads.
pub trait TxnLogic: Send {
    fn run(&self, ctx: &mut TxnContext<'_>);
}

/// View of a transaction handed to its body while it runs.
///
/// Reads come from the values captured before execution; writes are buffered
/// and reach storage only if the transaction commits.
pub struct TxnContext<'a> {
    reads: &'a BTreeMap<Key, Value>,
    writes: &'a mut BTreeMap<Key, Value>,
    status: &'a mut TxnStatus,
}

impl TxnContext<'_> {
    /// Returns the value observed for `key`, or `None` if the key did not
    /// exist when execution started. Only keys in the transaction's read and
    /// write sets are ever observed.
    pub fn read(&self, key: Key) -> Option<Value> {
        self.reads.get(&key).copied()
    }

    /// Buffers a write of `value` under `key`.
    pub fn write(&mut self, key: Key, value: Value) {
        self.writes.insert(key, value);
    }

    /// Simulates transaction work by sleeping on the executing thread.
    pub fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }

    /// Finishes the body with intent to commit.
    pub fn commit(&mut self) {
        *self.status = TxnStatus::CompletedCommit;
    }

    /// Finishes the body with intent to abort.
    pub fn abort(&mut self) {
        *self.status = TxnStatus::CompletedAbort;
    }
}

/// A transaction: fixed read and write sets, buffered reads and writes, and
/// the body that turns one into the other.
///
/// The record is passive. It is mutated by the scheduler (admission stamps,
/// status transitions, applied writes) and by its own body through
/// [`TxnContext`]; clients get it back through the result queue once it
/// reaches a terminal status.
pub struct Transaction {
    pub(crate) unique_id: TxnId,
    pub(crate) readset: BTreeSet<Key>,
    pub(crate) writeset: BTreeSet<Key>,
    pub(crate) reads: BTreeMap<Key, Value>,
    pub(crate) writes: BTreeMap<Key, Value>,
    pub(crate) status: TxnStatus,
    pub(crate) occ_start_time: Timestamp,
    logic: Box<dyn TxnLogic>,
}

impl Transaction {
    /// Builds a transaction over fixed key sets. A key must appear in at most
    /// one request per lock manager queue, so the locking scheduler requests a
    /// single (exclusive) lock for keys present in both sets.
    pub fn new(
        readset: BTreeSet<Key>,
        writeset: BTreeSet<Key>,
        logic: impl TxnLogic + 'static,
    ) -> Transaction {
        Transaction {
            unique_id: 0,
            readset,
            writeset,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            status: TxnStatus::Incomplete,
            occ_start_time: 0,
            logic: Box::new(logic),
        }
    }

    /// Identifier assigned on admission; 0 until the transaction is submitted.
    pub fn unique_id(&self) -> TxnId {
        self.unique_id
    }

    pub fn status(&self) -> TxnStatus {
        self.status
    }

    pub fn readset(&self) -> &BTreeSet<Key> {
        &self.readset
    }

    pub fn writeset(&self) -> &BTreeSet<Key> {
        &self.writeset
    }

    /// Values observed during the most recent execution.
    pub fn reads(&self) -> &BTreeMap<Key, Value> {
        &self.reads
    }

    /// Writes buffered by the most recent execution.
    pub fn writes(&self) -> &BTreeMap<Key, Value> {
        &self.writes
    }

    /// Runs the body against the captured reads.
    pub(crate) fn run(&mut self) {
        let Transaction {
            logic,
            reads,
            writes,
            status,
            ..
        } = self;
        let mut ctx = TxnContext {
            reads,
            writes,
            status,
        };
        logic.run(&mut ctx);
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("unique_id", &self.unique_id)
            .field("readset", &self.readset)
            .field("writeset", &self.writeset)
            .field("status", &self.status)
            .field("occ_start_time", &self.occ_start_time)
            .finish_non_exhaustive()
    }
}
