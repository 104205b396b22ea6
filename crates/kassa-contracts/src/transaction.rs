//! Transaction identity, status, and the ledger entity itself.
//!
//! A `Transaction` is the unit the POS ledger governs. Its `status` field
//! only ever changes through the ledger's transition functions; the legal
//! transition relation lives here as `TransactionStatus::can_transition_to`
//! so every consumer shares one exhaustive definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for one POS transaction.
///
/// Appears in every audit entry that concerns the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub uuid::Uuid);

impl TransactionId {
    /// Create a new, unique transaction ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the acting principal (an administrator or POS terminal
/// session). Never empty — every ledger operation names its actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a POS transaction.
///
/// `Cancelled`, `Refunded`, and `Storno` are terminal — nothing transitions
/// out of them. Paid transactions are never cancelled; they are refunded or
/// storno'd so the money movement stays on record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Created,
    PaymentPending,
    Paid,
    Cancelled,
    Refunded,
    Storno,
}

impl TransactionStatus {
    /// True for statuses from which no further transition is permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded | Self::Storno)
    }

    /// The complete legal transition relation of the ledger state machine.
    ///
    /// Exhaustive over both statuses: adding a variant forces this table to
    /// be revisited. `next == self` is not a transition and returns false.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        match (self, next) {
            (Created, PaymentPending) => true,
            (Created, Cancelled) => true,
            // Payment retry goes back to Created; the payment sub-record is
            // cleared by the ledger when taking this edge.
            (PaymentPending, Created) => true,
            (PaymentPending, Paid) => true,
            (PaymentPending, Cancelled) => true,
            (Paid, Refunded) => true,
            (Paid, Storno) => true,
            _ => false,
        }
    }

    /// Stable lowercase name used in logs and audit payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PaymentPending => "payment_pending",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::Storno => "storno",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment sub-record, populated when a payment is requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Payment provider name (e.g. "sumup", "zettle").
    pub provider: String,
    /// The provider's own identifier for this payment attempt.
    pub provider_tx_id: String,
    /// Set when the payment is confirmed; None while pending.
    pub approved_at: Option<DateTime<Utc>>,
}

/// A POS transaction as persisted in the transaction store.
///
/// `version` guards every update: `TransactionStore::update` only succeeds
/// when the caller's `version` matches the stored one, and bumps it on
/// success. Transactions are never deleted — terminal statuses are statuses,
/// not removals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub status: TransactionStatus,
    /// Sale price in the currency's minor unit.
    pub price_cents: u64,
    /// ISO 4217 currency code.
    pub currency: String,
    pub payment: Option<PaymentRecord>,
    /// Receipt number, stamped once by `issue_receipt`.
    pub receipt_no: Option<u64>,
    /// Invoice number, stamped once by `issue_invoice`.
    pub invoice_no: Option<u64>,
    /// Set when the implicit fiscalization after `confirm_paid` failed and
    /// a manual `tse_finish` is still owed.
    pub fiscal_sync_pending: bool,
    /// Optimistic-concurrency guard, starts at 0, bumped on every update.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a fresh transaction in `Created` with version 0.
    pub fn new(price_cents: u64, currency: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            status: TransactionStatus::Created,
            price_cents,
            currency: currency.into(),
            payment: None,
            receipt_no: None,
            invoice_no: None,
            fiscal_sync_pending: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
