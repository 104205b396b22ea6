//! Trait seams of the kassa ledger.
//!
//! These five traits define the complete boundary between the ledger's
//! state machine and the outside world:
//!
//! - `TransactionStore`  — durable transaction documents, optimistic writes
//! - `AuditSink`         — append-only hash-chained audit trail
//! - `SequenceCounter`   — duplicate-free receipt/invoice numbering
//! - `PaymentProvider`   — untrusted external payment status signal
//! - `Fiscalizer`        — the TSE device (opaque external collaborator)
//!
//! The `Ledger` wires them together; every state-changing operation runs as
//! validate → mutate → number → append, and only reports success once the
//! audit entry is durable.

use kassa_contracts::{
    audit::{AuditEntry, AuditRecord, ChainVerification},
    counter::CounterScope,
    error::KassaResult,
    transaction::{ActorId, Transaction, TransactionId},
};

use crate::provider::ProviderStatus;

/// Durable storage for transaction documents.
///
/// Updates are optimistic: `update` succeeds only when the caller's
/// `version` matches the stored one, and bumps it on success. There is no
/// general delete — `discard` exists solely to roll back a freshly inserted
/// transaction whose CREATE_TX audit entry could not be appended.
pub trait TransactionStore: Send + Sync {
    /// Persist a new transaction. Fails if the id already exists.
    fn insert(&self, tx: &Transaction) -> KassaResult<()>;

    /// Fetch a transaction by id, or `NotFound`.
    fn get(&self, id: &TransactionId) -> KassaResult<Transaction>;

    /// Conditionally replace the stored document.
    ///
    /// Precondition: `tx.version` equals the stored version. On success the
    /// stored copy (with `version + 1` and a fresh `updated_at`) is
    /// returned; on mismatch the call fails with `ConcurrencyConflict` and
    /// nothing changes.
    fn update(&self, tx: &Transaction) -> KassaResult<Transaction>;

    /// Remove a transaction that was inserted but never audited.
    ///
    /// Compensating rollback only: once a transaction's CREATE_TX entry is
    /// durable the ledger never calls this.
    fn discard(&self, id: &TransactionId) -> KassaResult<()>;
}

/// The append-only, hash-chained audit trail.
///
/// The trait surface deliberately has no update or delete — append-only is
/// a structural property of the seam, not a convention. Implementations
/// must serialize appends so that two concurrent calls never observe the
/// same chain tail.
pub trait AuditSink: Send + Sync {
    /// Append one record to the chain.
    ///
    /// Assigns id, timestamp, sequence, `prev_hash` (the current tail) and
    /// `this_hash`, and persists the entry atomically. Returns the sealed
    /// entry.
    fn append(&self, record: &AuditRecord) -> KassaResult<AuditEntry>;

    /// All entries in chain order (sequence 0 first).
    fn read_all(&self) -> KassaResult<Vec<AuditEntry>>;

    /// Recompute every hash and check linkage over the full chain.
    fn verify(&self) -> KassaResult<ChainVerification>;
}

/// Scoped, period-keyed monotone counters for fiscal document numbers.
///
/// For a given `(scope, period)` key, two concurrent `next` calls never
/// return the same value. The first call for an unseen key returns 1.
pub trait SequenceCounter: Send + Sync {
    /// Atomically increment and return the counter value.
    fn next(&self, scope: CounterScope, period: i32) -> KassaResult<u64>;

    /// Current value without incrementing; 0 for an unseen key.
    fn current(&self, scope: CounterScope, period: i32) -> KassaResult<u64>;
}

/// External payment provider status lookup.
///
/// The returned status is an untrusted signal: the ledger validates it
/// against the transaction's current state before driving any transition.
pub trait PaymentProvider: Send + Sync {
    fn payment_status(&self, provider_tx_id: &str) -> KassaResult<ProviderStatus>;
}

/// The fiscalization (TSE) device.
///
/// Treated as an opaque collaborator. A `finish` failure after a confirmed
/// payment never reverts the payment — the transaction is flagged for
/// manual retry instead.
pub trait Fiscalizer: Send + Sync {
    /// Open a fiscal transaction on the device.
    fn start(&self, tx: &Transaction, actor: &ActorId) -> KassaResult<()>;

    /// Close the fiscal transaction after payment.
    fn finish(&self, tx: &Transaction, actor: &ActorId) -> KassaResult<()>;
}
