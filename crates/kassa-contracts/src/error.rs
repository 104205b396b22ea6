//! Runtime error types for the kassa ledger.
//!
//! All fallible operations return `KassaResult<T>`. Variants carry enough
//! context to produce actionable log lines and precise rejections — a
//! rejected transition names both the current status and the attempted
//! action.

use thiserror::Error;

use crate::transaction::TransactionStatus;

/// The unified error type for the kassa POS ledger.
#[derive(Debug, Error)]
pub enum KassaError {
    /// The requested action is illegal from the transaction's current
    /// status. Rejected locally, never retried automatically.
    #[error("invalid transition: '{action}' is not legal from status '{from}'")]
    InvalidTransition {
        from: TransactionStatus,
        action: String,
    },

    /// An attempted mutation or deletion of an existing audit entry.
    ///
    /// Always a programmer error — it means something bypassed the
    /// append-only contract. Surfaced loudly, never swallowed.
    #[error("immutability violation: audit entry '{entry_id}' cannot be modified or deleted")]
    ImmutabilityViolation { entry_id: String },

    /// Chain verification found a hash mismatch or broken link.
    ///
    /// A compliance incident, not an operational error: it implies tamper
    /// or a bug, and is never auto-repaired.
    #[error("audit chain integrity broken at entry index {broken_at}")]
    ChainIntegrityError { broken_at: usize },

    /// An optimistic-write precondition failed: someone else updated the
    /// resource first. Recovered by re-reading and retrying, bounded by the
    /// configured retry count.
    #[error("concurrent modification of {resource}")]
    ConcurrencyConflict { resource: String },

    /// Storage-layer I/O failure. The operation must be treated as
    /// not-completed — no partial audit or ledger state remains.
    #[error("persistence failure: {reason}")]
    PersistenceError { reason: String },

    /// A payload could not be canonicalized for hashing. Never expected for
    /// payloads that passed upstream validation; treat as a fatal
    /// integrity-layer bug.
    #[error("payload canonicalization failed: {reason}")]
    EncodingError { reason: String },

    /// No record with the given id exists.
    #[error("no record found for id '{id}'")]
    NotFound { id: String },

    /// A refund amount above the transaction's original price.
    #[error("refund of {amount_cents} cents exceeds original price of {price_cents} cents")]
    RefundExceedsPrice { amount_cents: u64, price_cents: u64 },

    /// A receipt or invoice number was already stamped on the transaction.
    #[error("{document} already issued with number {number}")]
    AlreadyIssued { document: String, number: u64 },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The payment provider could not report a status.
    #[error("payment provider error: {reason}")]
    ProviderError { reason: String },

    /// The fiscalization (TSE) device rejected or failed a call.
    #[error("fiscalization failed: {reason}")]
    FiscalizationFailed { reason: String },
}

/// Convenience alias used throughout the kassa crates.
pub type KassaResult<T> = Result<T, KassaError>;
