use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or out-of-range caller input. Reported to the caller; no state change.
    #[error("validation error: {0}")]
    Validation(String),
    /// Malformed signing input or a failed signature check. Logged as a security
    /// event; the detail must not be echoed to the external caller.
    #[error("signature error: {0}")]
    Signature(String),
    /// Missing or invalid operator-supplied configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The order store rejected the insert, or did not answer within the deadline.
    #[error("order creation failed: {0}")]
    OrderCreation(String),
    /// A state-machine transition was attempted from an incompatible state.
    #[error("transition rejected: {from} -> {to}")]
    TransitionRejected { from: String, to: String },
    /// The ledger sum-of-parts invariant would break. The mutation is aborted and
    /// the account requires manual reconciliation.
    #[error("balance invariant violated for store {0}")]
    BalanceInvariant(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}
