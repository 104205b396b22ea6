//! In-memory implementation of `AuditSink`.
//!
//! `InMemoryAuditLog` keeps the global chain in a `Vec` behind a `Mutex`.
//! The mutex is the single-writer serialization point for the chain tail:
//! reading the tail, hashing, and appending happen under one lock
//! acquisition, so two concurrent appends can never both link to the same
//! predecessor.
//!
//! The `AuditSink` surface is append-and-read only. The explicit
//! `try_update`/`try_delete` guards exist for callers that would otherwise
//! reach for a generic document-store mutation — they always fail with
//! `ImmutabilityViolation` and leave the entry untouched.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::info;

use kassa_contracts::{
    audit::{AuditEntry, AuditRecord, ChainVerification},
    error::{KassaError, KassaResult},
};
use kassa_core::traits::AuditSink;

use crate::chain::{canonicalize, hash_entry, verify_chain};

// ── Internal mutable state ────────────────────────────────────────────────────

/// The mutable interior of an `InMemoryAuditLog`.
pub(crate) struct LogState {
    /// All entries written so far, in append order.
    pub(crate) entries: Vec<AuditEntry>,

    /// The next sequence number to assign (starts at 0).
    pub(crate) sequence: u64,

    /// The `this_hash` of the last appended entry, or `GENESIS_HASH` before
    /// any entry exists.
    pub(crate) tail_hash: String,
}

// ── Public log ────────────────────────────────────────────────────────────────

/// An in-memory, append-only audit log backed by a global SHA-256 hash
/// chain.
///
/// Cloning is cheap and shares the underlying chain, so one handle can be
/// boxed into the ledger while another stays available for verification
/// and export.
#[derive(Clone)]
pub struct InMemoryAuditLog {
    pub(crate) state: Arc<Mutex<LogState>>,
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuditLog {
    /// Create an empty log whose tail is the genesis sentinel, so the first
    /// entry's `prev_hash` is automatically correct.
    pub fn new() -> Self {
        let state = LogState {
            entries: Vec::new(),
            sequence: 0,
            tail_hash: AuditEntry::GENESIS_HASH.to_string(),
        };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn lock(&self) -> KassaResult<MutexGuard<'_, LogState>> {
        self.state.lock().map_err(|e| KassaError::PersistenceError {
            reason: format!("audit log lock poisoned: {}", e),
        })
    }

    /// The current chain tail: the last entry's hash, or the genesis
    /// sentinel for an empty log.
    pub fn tail_hash(&self) -> KassaResult<String> {
        Ok(self.lock()?.tail_hash.clone())
    }

    /// Number of entries in the chain.
    pub fn len(&self) -> KassaResult<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> KassaResult<bool> {
        Ok(self.lock()?.entries.is_empty())
    }

    /// Guard against in-place modification.
    ///
    /// Audit entries are immutable once appended; any attempted update is a
    /// bypass of the append-only contract and always fails. An unknown id
    /// fails with `NotFound` instead, so callers can tell the two apart.
    pub fn try_update(&self, entry_id: &uuid::Uuid, _payload: serde_json::Value) -> KassaResult<()> {
        let state = self.lock()?;
        if state.entries.iter().any(|e| &e.id == entry_id) {
            return Err(KassaError::ImmutabilityViolation {
                entry_id: entry_id.to_string(),
            });
        }
        Err(KassaError::NotFound { id: entry_id.to_string() })
    }

    /// Guard against deletion. Same contract as [`try_update`].
    ///
    /// [`try_update`]: InMemoryAuditLog::try_update
    pub fn try_delete(&self, entry_id: &uuid::Uuid) -> KassaResult<()> {
        let state = self.lock()?;
        if state.entries.iter().any(|e| &e.id == entry_id) {
            return Err(KassaError::ImmutabilityViolation {
                entry_id: entry_id.to_string(),
            });
        }
        Err(KassaError::NotFound { id: entry_id.to_string() })
    }

    /// Entries concerning one transaction, in chain order.
    pub fn entries_for(
        &self,
        transaction_id: &kassa_contracts::transaction::TransactionId,
    ) -> KassaResult<Vec<AuditEntry>> {
        let state = self.lock()?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.transaction_id.as_ref() == Some(transaction_id))
            .cloned()
            .collect())
    }
}

// ── AuditSink impl ────────────────────────────────────────────────────────────

impl AuditSink for InMemoryAuditLog {
    /// Append one record to the chain.
    ///
    /// Reads the tail, canonicalizes the record with its freshly assigned
    /// timestamp, computes `this_hash`, and appends — all under one lock,
    /// so the tail a writer links to is always the entry it follows.
    fn append(&self, record: &AuditRecord) -> KassaResult<AuditEntry> {
        let mut state = self.lock()?;

        let created_at = Utc::now();
        let prev_hash = state.tail_hash.clone();
        let sequence = state.sequence;

        let canonical = canonicalize(
            &record.actor_id,
            record.action,
            record.transaction_id.as_ref(),
            &record.payload,
            &created_at,
            sequence,
        )?;
        let this_hash = hash_entry(&prev_hash, &canonical);

        let entry = AuditEntry {
            id: uuid::Uuid::new_v4(),
            sequence,
            actor_id: record.actor_id.clone(),
            action: record.action,
            transaction_id: record.transaction_id.clone(),
            payload: record.payload.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
            created_at,
        };

        state.entries.push(entry.clone());
        state.sequence += 1;
        state.tail_hash = this_hash;

        info!(
            action = %entry.action,
            sequence = entry.sequence,
            "audit entry appended"
        );

        Ok(entry)
    }

    fn read_all(&self) -> KassaResult<Vec<AuditEntry>> {
        Ok(self.lock()?.entries.clone())
    }

    fn verify(&self) -> KassaResult<ChainVerification> {
        let state = self.lock()?;
        verify_chain(&state.entries)
    }
}
