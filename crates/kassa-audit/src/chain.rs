//! Hash-chain primitives: canonicalization, hashing, and chain
//! verification.
//!
//! Hash input layout (bytes, in order):
//!   1. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   2. canonical JSON of the entry's logical fields
//!
//! The canonical JSON is an object with a fixed key set — `action`,
//! `actor_id`, `created_at`, `payload`, `sequence`, `transaction_id` —
//! serialized with sorted keys and no whitespace, so identical semantic
//! content always produces identical bytes and the chain can be re-verified
//! independently. Including `sequence` means an entry's chain position is
//! part of what its hash commits to.

use chrono::{DateTime, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};

use kassa_contracts::{
    audit::{AuditAction, AuditEntry, ChainVerification},
    error::{KassaError, KassaResult},
    transaction::{ActorId, TransactionId},
};

/// Produce the canonical byte representation of an entry's logical fields.
///
/// Timestamps are rendered as RFC 3339 strings; `serde_json`'s object maps
/// are BTreeMap-backed, so the keys serialize in sorted order regardless of
/// construction order.
///
/// Fails with `EncodingError` only for payloads that cannot be serialized —
/// which cannot happen for plain `serde_json::Value` payloads that passed
/// upstream validation; treat a failure here as an integrity-layer bug.
pub fn canonicalize(
    actor_id: &ActorId,
    action: AuditAction,
    transaction_id: Option<&TransactionId>,
    payload: &serde_json::Value,
    created_at: &DateTime<Utc>,
    sequence: u64,
) -> KassaResult<Vec<u8>> {
    let canonical = json!({
        "action": action.as_str(),
        "actor_id": actor_id.0,
        "created_at": created_at.to_rfc3339(),
        "payload": payload,
        "sequence": sequence,
        "transaction_id": transaction_id.map(|id| id.to_string()),
    });
    serde_json::to_vec(&canonical).map_err(|e| KassaError::EncodingError {
        reason: format!("audit payload is not canonicalizable: {}", e),
    })
}

/// Canonical bytes for a stored entry, from its own fields.
pub fn canonicalize_entry(entry: &AuditEntry) -> KassaResult<Vec<u8>> {
    canonicalize(
        &entry.actor_id,
        entry.action,
        entry.transaction_id.as_ref(),
        &entry.payload,
        &entry.created_at,
        entry.sequence,
    )
}

/// Compute the SHA-256 digest for one entry.
///
/// Commits to the link (`prev_hash`) and the entry's canonical content.
/// Returns a lowercase 64-character hex string.
pub fn hash_entry(prev_hash: &str, canonical: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical);
    hex::encode(hasher.finalize())
}

/// Verify the integrity of a hash chain.
///
/// Two rules, checked per entry in order, failing fast at the first
/// mismatch:
///
/// 1. **Prev-hash linkage** — the entry's `prev_hash` equals the
///    `this_hash` of the preceding entry (or `GENESIS_HASH` for entry 0).
/// 2. **Hash correctness** — the entry's `this_hash` matches the value
///    recomputed from its own fields.
///
/// An empty chain is valid. The returned `ChainVerification` carries the
/// index of the first offending entry when the chain is broken.
pub fn verify_chain(entries: &[AuditEntry]) -> KassaResult<ChainVerification> {
    let mut expected_prev = AuditEntry::GENESIS_HASH.to_string();

    for (index, entry) in entries.iter().enumerate() {
        if entry.prev_hash != expected_prev {
            return Ok(ChainVerification::broken(index));
        }

        let canonical = canonicalize_entry(entry)?;
        if hash_entry(&entry.prev_hash, &canonical) != entry.this_hash {
            return Ok(ChainVerification::broken(index));
        }

        expected_prev = entry.this_hash.clone();
    }

    Ok(ChainVerification::valid())
}
