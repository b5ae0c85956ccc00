use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Transient transport failure talking to a live venue. Retryable with
    /// backoff by the caller; never returned by the simulated ledger.
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    /// A parameter that violates an invariant (negative amount, zero price).
    /// Fails fast at construction or call time; never recovered locally.
    #[error("Invalid parameter for {0}: {1}")]
    InvalidParameter(String, String),

    #[error("Core type error: {0}")]
    Core(#[from] core_types::CoreError),
}
