//! Audit actions, records, and the hash-chained audit entry.
//!
//! `AuditRecord` is what a ledger operation hands to the audit sink — the
//! action, its actor, and a canonicalizable payload. `AuditEntry` is the
//! persisted form: the record's fields plus chain position, the link to the
//! previous entry, and its own hash. Entries are never mutated or removed
//! after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KassaError, KassaResult};
use crate::transaction::{ActorId, TransactionId};

/// The closed set of auditable POS actions.
///
/// Serialized in SCREAMING_SNAKE_CASE to match the audit collection's wire
/// names. Adding a variant forces the ledger's transition functions and the
/// payload builders to be revisited — the enum is matched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateTx,
    PaymentStatusUpdate,
    PaymentMarkPaid,
    UpdatePrice,
    Cancel,
    Refund,
    Storno,
    IssueReceipt,
    IssueInvoice,
    SignContract,
    TseStart,
    TseFinish,
}

impl AuditAction {
    /// Stable wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateTx => "CREATE_TX",
            Self::PaymentStatusUpdate => "PAYMENT_STATUS_UPDATE",
            Self::PaymentMarkPaid => "PAYMENT_MARK_PAID",
            Self::UpdatePrice => "UPDATE_PRICE",
            Self::Cancel => "CANCEL",
            Self::Refund => "REFUND",
            Self::Storno => "STORNO",
            Self::IssueReceipt => "ISSUE_RECEIPT",
            Self::IssueInvoice => "ISSUE_INVOICE",
            Self::SignContract => "SIGN_CONTRACT",
            Self::TseStart => "TSE_START",
            Self::TseFinish => "TSE_FINISH",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The candidate an operation submits to the audit sink.
///
/// Carries everything except what the sink assigns at append time: id,
/// timestamp, sequence, and the two chain hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Who performed the action. Never empty.
    pub actor_id: ActorId,
    pub action: AuditAction,
    /// The transaction this action concerns; None for actions not tied to
    /// one transaction.
    pub transaction_id: Option<TransactionId>,
    /// Action-specific detail (old/new price, refund amount, issued number).
    /// Must be plain JSON — it is canonicalized before hashing.
    pub payload: serde_json::Value,
}

impl AuditRecord {
    pub fn new(actor_id: ActorId, action: AuditAction) -> Self {
        Self {
            actor_id,
            action,
            transaction_id: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn for_transaction(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// A single entry in the global SHA-256 audit chain.
///
/// Each entry commits to its predecessor via `prev_hash`. Modifying any
/// field — including the payload — invalidates `this_hash` and every
/// subsequent `prev_hash`, which chain verification detects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Opaque unique identifier, assigned at append time.
    pub id: uuid::Uuid,
    /// Monotonically increasing position in the chain, starting at 0.
    pub sequence: u64,
    pub actor_id: ActorId,
    pub action: AuditAction,
    pub transaction_id: Option<TransactionId>,
    pub payload: serde_json::Value,
    /// Hash (hex) of the previous entry, or `GENESIS_HASH` for entry 0.
    pub prev_hash: String,
    /// SHA-256 hash (hex) over `prev_hash || canonical entry bytes`.
    pub this_hash: String,
    /// Assignment timestamp; immutable, part of the hashed content.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// The sentinel `prev_hash` for the first entry of the chain.
    ///
    /// 64 hex zeros — never the SHA-256 of real data, so genesis detection
    /// is unambiguous.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Outcome of a full-chain verification pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    pub ok: bool,
    /// Index of the first entry that failed linkage or hash recomputation.
    /// None when `ok` is true.
    pub broken_at: Option<usize>,
}

impl ChainVerification {
    pub fn valid() -> Self {
        Self { ok: true, broken_at: None }
    }

    pub fn broken(index: usize) -> Self {
        Self { ok: false, broken_at: Some(index) }
    }

    /// Promote a broken verification to `ChainIntegrityError`.
    ///
    /// For boundaries where a broken chain must halt processing rather than
    /// be reported as a verdict.
    pub fn ensure_ok(&self) -> KassaResult<()> {
        match self.broken_at {
            None => Ok(()),
            Some(index) => Err(KassaError::ChainIntegrityError { broken_at: index }),
        }
    }
}
