use thiserror::Error;

/// Errors surfaced by the client-facing processor API.
///
/// Lock manager and storage operations never fail; transaction aborts and OCC
/// validation failures are reported through [`TxnStatus`](crate::TxnStatus)
/// rather than as errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The processor's scheduler and worker pool are gone; no further
    /// transactions can be submitted and no further results will arrive.
    #[error("transaction processor has shut down")]
    Shutdown,
}
