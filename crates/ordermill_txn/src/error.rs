//! Structured error taxonomy for the store boundary and the transaction
//! handlers. A timed-out write is distinct from a data error because the
//! store may still apply it after the deadline; callers decide whether the
//! operation is safe to retry.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by the store client itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The contact point could not be reached. Fatal to the worker.
    #[error("cannot reach contact point {contact}: {reason}")]
    Connection { contact: String, reason: String },

    /// A round trip exceeded its deadline. The write may or may not have
    /// applied; only idempotent steps should be retried.
    #[error("store round trip exceeded {0:?}")]
    Timeout(Duration),

    /// The store reported a failure executing the request.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Failures surfaced by a transaction handler. Every transaction call ends
/// in either a typed success payload or one of these; partial state is
/// never silently swallowed.
#[derive(Debug, Error)]
pub enum TxnError {
    /// Malformed input, rejected before any network call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced row does not exist; the transaction is aborted.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A conditional write lost its race every time within the retry
    /// budget. The caller may retry the whole transaction with fresh reads.
    #[error("conditional write on {what} lost the race after {attempts} attempts")]
    Conflict { what: &'static str, attempts: u32 },

    /// Store-level failure (connection, timeout, backend).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A Payment step failed after earlier steps applied. The earlier
    /// updates are not rolled back; each row update is self-contained and
    /// this is accepted benchmark-level eventual-consistency behavior.
    #[error("payment step `{step}` failed: {source}")]
    PaymentStep {
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// A NewOrder abort could not fully unwind its compensating actions.
    /// `leftover` counts the compensations that were not applied; manual
    /// reconciliation may be needed.
    #[error("abort cleanup failed after {cause}; {leftover} compensating writes unapplied: {cleanup}")]
    CleanupFailed {
        cause: Box<TxnError>,
        leftover: usize,
        cleanup: StoreError,
    },
}

pub type TxnResult<T> = Result<T, TxnError>;

impl TxnError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        TxnError::NotFound {
            entity,
            key: key.into(),
        }
    }
}
