use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a record in storage. Totally ordered and hashable.
pub type Key = u64;
/// Payload stored under a [`Key`].
pub type Value = u64;
/// Unique transaction identifier, assigned monotonically on admission.
pub type TxnId = u64;
/// Wall-clock instant in nanoseconds since the Unix epoch. Zero means "never".
pub type Timestamp = u64;

/// Reads the wall clock used for storage write stamps and OCC start times.
pub(crate) fn wall_clock() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as Timestamp)
        .unwrap_or(0)
}
