//! Error types for the wager and ledger core.
//!
//! Every variant is classified by what the caller may safely do next:
//! validation failures can be retried immediately with corrected input,
//! `InsufficientBalance` fails closed with no mutation, duplicate chain
//! signatures are idempotent no-ops, external verification failures and
//! concurrency conflicts are retryable, and storage corruption is terminal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CasinoError {
    /// Malformed or out-of-range bet or game parameters. No mutation occurred.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The atomic balance check rejected a debit. No mutation occurred.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The chain signature was already converted into a ledger mutation.
    #[error("duplicate transaction: {0}")]
    DuplicateTransaction(String),

    /// Chain lookup unavailable, or the transaction was not found/failed.
    #[error("chain verification failed: {0}")]
    ExternalVerification(String),

    /// The per-account atomic step lost a race; the whole operation may be
    /// retried from validation.
    #[error("concurrent ledger update conflict")]
    ConcurrencyConflict,

    /// Withdrawal amount outside the configured min/max bounds.
    #[error("withdrawal amount out of bounds: {0}")]
    WithdrawalBounds(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// Stored record failed to decode. Surfaced as a 5xx, never folded into
    /// a game outcome.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl CasinoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CasinoError::Validation(msg.into())
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CasinoError::ExternalVerification(_) | CasinoError::ConcurrencyConflict
        )
    }
}

impl From<rocksdb::Error> for CasinoError {
    fn from(e: rocksdb::Error) -> Self {
        CasinoError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CasinoError {
    fn from(e: serde_json::Error) -> Self {
        CasinoError::Corrupt(e.to_string())
    }
}

pub type CasinoResult<T> = Result<T, CasinoError>;
