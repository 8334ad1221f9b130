//! Pluggable in-memory transaction processor for comparing concurrency-control
//! protocols under contention.
//!
//! A [`TxnProcessor`] executes read-modify-write transactions against a
//! versioned key/value store under one of several protocols: serial execution,
//! strict two-phase locking (exclusive-only or shared/exclusive, see
//! [`lock`]), and optimistic concurrency control with serial or parallel
//! validation. Transaction bodies implement [`TxnLogic`] over fixed read and
//! write sets; clients submit them and collect them back in completion order.

mod error;
pub mod lock;
mod processor;
mod storage;
mod transaction;
mod types;
mod workload;

pub use error::Error;
pub use processor::{Protocol, TxnProcessor};
pub use storage::Storage;
pub use transaction::{Transaction, TxnContext, TxnLogic, TxnStatus};
pub use types::{Key, Timestamp, TxnId, Value};
pub use workload::{expect, noop, put, rmw};
