//! # kassa-audit
//!
//! Immutable, append-only, SHA-256 hash-chained audit trail for the kassa
//! POS ledger.
//!
//! ## Overview
//!
//! Every state-changing ledger action is recorded as an `AuditEntry` that
//! links to the previous entry via its SHA-256 hash. The chain is global —
//! one chain across all POS activity — so the append sequence itself is
//! load-bearing evidence: tampering with any entry, or silently dropping
//! or reordering one, breaks the chain and is detected by `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_audit::InMemoryAuditLog;
//! use kassa_core::traits::AuditSink;
//!
//! let log = InMemoryAuditLog::new();
//! let entry = log.append(&record)?;
//! assert!(log.verify()?.ok);
//! ```

pub mod chain;
pub mod memory;

pub use chain::{canonicalize, canonicalize_entry, hash_entry, verify_chain};
pub use memory::InMemoryAuditLog;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;
    use serde_json::json;

    use kassa_contracts::{
        audit::{AuditAction, AuditEntry, AuditRecord},
        error::KassaError,
        transaction::{ActorId, TransactionId},
    };
    use kassa_core::traits::AuditSink;

    use super::{canonicalize, canonicalize_entry, hash_entry, verify_chain, InMemoryAuditLog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a record with a distinguishable payload.
    fn make_record(action: AuditAction, note: &str) -> AuditRecord {
        AuditRecord::new(ActorId::new("admin-1"), action)
            .for_transaction(TransactionId::new())
            .with_payload(json!({ "note": note }))
    }

    // ── Chain integrity ───────────────────────────────────────────────────────

    #[test]
    fn appended_entries_form_a_valid_chain() {
        let log = InMemoryAuditLog::new();
        log.append(&make_record(AuditAction::CreateTx, "first")).unwrap();
        log.append(&make_record(AuditAction::UpdatePrice, "second")).unwrap();
        log.append(&make_record(AuditAction::Cancel, "third")).unwrap();

        let verification = log.verify().unwrap();
        assert!(verification.ok, "chain must be valid after sequential appends");
        assert_eq!(verification.broken_at, None);
    }

    #[test]
    fn consecutive_entries_link_and_recompute() {
        let log = InMemoryAuditLog::new();
        for i in 0..5 {
            log.append(&make_record(AuditAction::CreateTx, &format!("entry-{i}"))).unwrap();
        }

        let entries = log.read_all().unwrap();
        for i in 1..entries.len() {
            assert_eq!(
                entries[i].prev_hash, entries[i - 1].this_hash,
                "entry {i} must link to its predecessor"
            );
        }
        for entry in &entries {
            let canonical = canonicalize_entry(entry).unwrap();
            assert_eq!(
                hash_entry(&entry.prev_hash, &canonical),
                entry.this_hash,
                "stored hash must be reproducible from the entry's own fields"
            );
        }
    }

    #[test]
    fn first_entry_links_to_genesis() {
        let log = InMemoryAuditLog::new();
        assert_eq!(log.tail_hash().unwrap(), AuditEntry::GENESIS_HASH);

        let entry = log.append(&make_record(AuditAction::CreateTx, "first")).unwrap();
        assert_eq!(entry.prev_hash, AuditEntry::GENESIS_HASH);
        assert_eq!(log.tail_hash().unwrap(), entry.this_hash);
    }

    #[test]
    fn sequence_numbers_are_gapless_from_zero() {
        let log = InMemoryAuditLog::new();
        for i in 0..4 {
            let entry = log.append(&make_record(AuditAction::CreateTx, &i.to_string())).unwrap();
            assert_eq!(entry.sequence, i);
        }
    }

    #[test]
    fn empty_chain_is_valid() {
        let log = InMemoryAuditLog::new();
        assert!(log.verify().unwrap().ok);
        assert!(verify_chain(&[]).unwrap().ok);
    }

    // ── Tamper detection ──────────────────────────────────────────────────────

    #[test]
    fn payload_tampering_is_detected_at_the_right_index() {
        let log = InMemoryAuditLog::new();
        log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();
        log.append(&make_record(AuditAction::UpdatePrice, "b")).unwrap();
        log.append(&make_record(AuditAction::Cancel, "c")).unwrap();

        // Simulate out-of-band mutation of a stored entry.
        {
            let mut state = log.state.lock().unwrap();
            state.entries[1].payload = json!({ "note": "TAMPERED" });
        }

        let verification = log.verify().unwrap();
        assert!(!verification.ok);
        assert_eq!(verification.broken_at, Some(1));
    }

    #[test]
    fn sequence_tampering_is_detected() {
        let log = InMemoryAuditLog::new();
        log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();
        log.append(&make_record(AuditAction::UpdatePrice, "b")).unwrap();
        log.append(&make_record(AuditAction::Cancel, "c")).unwrap();

        // The chain position is part of the hashed content, so rewriting
        // just the sequence field invalidates the entry's hash.
        {
            let mut state = log.state.lock().unwrap();
            state.entries[1].sequence = 99;
        }

        let verification = log.verify().unwrap();
        assert!(!verification.ok);
        assert_eq!(verification.broken_at, Some(1));
    }

    #[test]
    fn broken_linkage_is_detected() {
        let log = InMemoryAuditLog::new();
        log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();
        log.append(&make_record(AuditAction::UpdatePrice, "b")).unwrap();

        {
            let mut state = log.state.lock().unwrap();
            state.entries[1].prev_hash = AuditEntry::GENESIS_HASH.to_string();
        }

        let verification = log.verify().unwrap();
        assert!(!verification.ok);
        assert_eq!(verification.broken_at, Some(1));
    }

    #[test]
    fn removing_an_entry_breaks_the_chain() {
        let log = InMemoryAuditLog::new();
        log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();
        log.append(&make_record(AuditAction::UpdatePrice, "b")).unwrap();
        log.append(&make_record(AuditAction::Cancel, "c")).unwrap();

        {
            let mut state = log.state.lock().unwrap();
            state.entries.remove(1);
        }

        let verification = log.verify().unwrap();
        assert!(!verification.ok, "silent omission must be detectable");
        assert_eq!(verification.broken_at, Some(1));
    }

    // ── Immutability guards ───────────────────────────────────────────────────

    #[test]
    fn update_of_an_existing_entry_always_fails() {
        let log = InMemoryAuditLog::new();
        let entry = log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();

        match log.try_update(&entry.id, json!({ "note": "rewritten" })) {
            Err(KassaError::ImmutabilityViolation { entry_id }) => {
                assert_eq!(entry_id, entry.id.to_string());
            }
            other => panic!("expected ImmutabilityViolation, got {:?}", other),
        }

        // The entry is unchanged and the chain still verifies.
        let stored = log.read_all().unwrap();
        assert_eq!(stored[0].payload, json!({ "note": "a" }));
        assert!(log.verify().unwrap().ok);
    }

    #[test]
    fn delete_of_an_existing_entry_always_fails() {
        let log = InMemoryAuditLog::new();
        let entry = log.append(&make_record(AuditAction::CreateTx, "a")).unwrap();

        assert!(matches!(
            log.try_delete(&entry.id),
            Err(KassaError::ImmutabilityViolation { .. })
        ));
        assert_eq!(log.len().unwrap(), 1);
    }

    #[test]
    fn mutation_guards_distinguish_unknown_ids() {
        let log = InMemoryAuditLog::new();
        let unknown = uuid::Uuid::new_v4();

        assert!(matches!(log.try_update(&unknown, json!({})), Err(KassaError::NotFound { .. })));
        assert!(matches!(log.try_delete(&unknown), Err(KassaError::NotFound { .. })));
    }

    // ── Canonicalization ──────────────────────────────────────────────────────

    #[test]
    fn canonicalization_is_deterministic() {
        let actor = ActorId::new("admin-1");
        let tx_id = TransactionId::new();
        let payload = json!({ "b": 2, "a": 1 });
        let at = Utc::now();

        let first =
            canonicalize(&actor, AuditAction::Refund, Some(&tx_id), &payload, &at, 0).unwrap();
        let second =
            canonicalize(&actor, AuditAction::Refund, Some(&tx_id), &payload, &at, 0).unwrap();
        assert_eq!(first, second);

        // Sorted keys: "a" serializes before "b" regardless of insertion order.
        let text = String::from_utf8(first).unwrap();
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }

    #[test]
    fn canonical_bytes_differ_when_any_field_differs() {
        let actor = ActorId::new("admin-1");
        let at = Utc::now();
        let base = canonicalize(&actor, AuditAction::Cancel, None, &json!({}), &at, 0).unwrap();

        let other_action =
            canonicalize(&actor, AuditAction::Refund, None, &json!({}), &at, 0).unwrap();
        assert_ne!(base, other_action);

        let other_actor =
            canonicalize(&ActorId::new("admin-2"), AuditAction::Cancel, None, &json!({}), &at, 0)
                .unwrap();
        assert_ne!(base, other_actor);

        let other_sequence =
            canonicalize(&actor, AuditAction::Cancel, None, &json!({}), &at, 1).unwrap();
        assert_ne!(base, other_sequence);
    }

    // ── Concurrency ───────────────────────────────────────────────────────────

    /// Concurrent appends must serialize on the tail: afterwards the chain
    /// verifies, and every sequence number appears exactly once.
    #[test]
    fn concurrent_appends_keep_the_chain_intact() {
        let log = InMemoryAuditLog::new();
        let threads: Vec<_> = (0..8)
            .map(|t| {
                let log = log.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        log.append(&make_record(AuditAction::CreateTx, &format!("{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in threads {
            handle.join().unwrap();
        }

        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 80);

        let sequences: HashSet<u64> = entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences.len(), 80, "no two appends may claim the same position");

        assert!(log.verify().unwrap().ok, "interleaved appends must still chain correctly");
    }

    // ── Per-transaction reads ─────────────────────────────────────────────────

    #[test]
    fn entries_for_filters_by_transaction() {
        let log = InMemoryAuditLog::new();
        let tx_id = TransactionId::new();

        log.append(
            &AuditRecord::new(ActorId::new("admin-1"), AuditAction::CreateTx)
                .for_transaction(tx_id.clone()),
        )
        .unwrap();
        log.append(&make_record(AuditAction::CreateTx, "other")).unwrap();
        log.append(
            &AuditRecord::new(ActorId::new("admin-1"), AuditAction::Cancel)
                .for_transaction(tx_id.clone()),
        )
        .unwrap();

        let entries = log.entries_for(&tx_id).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::CreateTx);
        assert_eq!(entries[1].action, AuditAction::Cancel);
    }
}
