//! # kassa-ref-pos
//!
//! Reference POS wiring for the kassa ledger: mock collaborators, a fully
//! wired `PosRig`, and the runnable demo scenarios. The end-to-end tests
//! here exercise the real audit chain and counters together with the
//! ledger, where the per-crate tests use in-module mocks.

pub mod mocks;
pub mod rig;
pub mod scenarios;

pub use mocks::{MockPaymentProvider, MockTse};
pub use rig::PosRig;

// ── End-to-end tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use kassa_audit::verify_chain;
    use kassa_contracts::{
        audit::AuditAction,
        error::KassaError,
        transaction::{ActorId, TransactionStatus},
    };
    use kassa_core::{provider::ProviderStatus, traits::AuditSink};

    use super::PosRig;

    fn cashier() -> ActorId {
        ActorId::new("cashier-anna")
    }

    /// The canonical sale: create → request payment → confirm → receipt.
    /// Exactly four chained entries, receipt number 1, final status paid.
    #[test]
    fn checkout_produces_four_chained_entries() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.request_payment(&a, &tx.id, "sumup", "prov-1").unwrap();
        rig.ledger.confirm_paid(&a, &tx.id).unwrap();
        let stamped = rig.ledger.issue_receipt(&a, &tx.id).unwrap();

        assert_eq!(stamped.status, TransactionStatus::Paid);
        assert_eq!(stamped.receipt_no, Some(1));

        let entries = rig.audit.read_all().unwrap();
        let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::CreateTx,
                AuditAction::PaymentStatusUpdate,
                AuditAction::PaymentMarkPaid,
                AuditAction::IssueReceipt,
            ]
        );

        // Real chain: linked and verifiable.
        for i in 1..entries.len() {
            assert_eq!(entries[i].prev_hash, entries[i - 1].this_hash);
        }
        assert!(rig.audit.verify().unwrap().ok);
    }

    #[test]
    fn cancelled_transaction_cannot_be_refunded() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.cancel(&a, &tx.id).unwrap();

        let actions: Vec<AuditAction> =
            rig.audit.read_all().unwrap().iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::CreateTx, AuditAction::Cancel]);

        match rig.ledger.refund(&a, &tx.id, 1000) {
            Err(KassaError::InvalidTransition { from, action }) => {
                assert_eq!(from, TransactionStatus::Cancelled);
                assert_eq!(action, "refund");
            }
            other => panic!("expected InvalidTransition, got {:?}", other),
        }
    }

    #[test]
    fn refunded_transaction_cannot_be_stornoed() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.request_payment(&a, &tx.id, "sumup", "prov-1").unwrap();
        rig.ledger.confirm_paid(&a, &tx.id).unwrap();
        let refunded = rig.ledger.refund(&a, &tx.id, 1000).unwrap();

        assert_eq!(refunded.status, TransactionStatus::Refunded);
        assert_eq!(
            rig.audit.read_all().unwrap().last().unwrap().action,
            AuditAction::Refund
        );

        assert!(matches!(
            rig.ledger.storno(&a, &tx.id),
            Err(KassaError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn provider_driven_checkout_matches_manual_confirm() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.provider.script("card-7", ProviderStatus::Approved);
        rig.ledger.request_payment(&a, &tx.id, "sumup", "card-7").unwrap();

        let paid = rig.ledger.sync_payment_status(&a, &tx.id).unwrap();
        assert_eq!(paid.status, TransactionStatus::Paid);
        assert!(rig.audit.verify().unwrap().ok);
    }

    #[test]
    fn tse_outage_flags_and_manual_finish_clears() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.request_payment(&a, &tx.id, "sumup", "prov-1").unwrap();

        rig.tse.set_offline(true);
        let paid = rig.ledger.confirm_paid(&a, &tx.id).unwrap();
        assert_eq!(paid.status, TransactionStatus::Paid);
        assert!(paid.fiscal_sync_pending);

        rig.tse.set_offline(false);
        let synced = rig.ledger.tse_finish(&a, &tx.id).unwrap();
        assert!(!synced.fiscal_sync_pending);

        assert_eq!(
            rig.audit.read_all().unwrap().last().unwrap().action,
            AuditAction::TseFinish
        );
        assert!(rig.audit.verify().unwrap().ok);
        // Two finish calls: the failed implicit one and the manual retry.
        let finishes = rig.tse.calls().iter().filter(|c| c.starts_with("finish")).count();
        assert_eq!(finishes, 2);
    }

    #[test]
    fn tampered_copy_is_pinpointed_real_chain_stays_valid() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.update_price(&a, &tx.id, 1100).unwrap();
        rig.ledger.cancel(&a, &tx.id).unwrap();

        let mut tampered = rig.audit.read_all().unwrap();
        tampered[1].payload = json!({ "old_price_cents": 1000, "new_price_cents": 1 });

        let verification = verify_chain(&tampered).unwrap();
        assert!(!verification.ok);
        assert_eq!(verification.broken_at, Some(1));

        assert!(rig.audit.verify().unwrap().ok);
    }

    #[test]
    fn audit_entries_cannot_be_mutated_in_place() {
        let rig = PosRig::new();
        let a = cashier();

        let tx = rig.ledger.create_transaction(&a, 1000, "EUR").unwrap();
        rig.ledger.cancel(&a, &tx.id).unwrap();

        let entries = rig.audit.read_all().unwrap();
        for entry in &entries {
            assert!(matches!(
                rig.audit.try_update(&entry.id, json!({})),
                Err(KassaError::ImmutabilityViolation { .. })
            ));
            assert!(matches!(
                rig.audit.try_delete(&entry.id),
                Err(KassaError::ImmutabilityViolation { .. })
            ));
        }

        // Nothing changed.
        assert_eq!(rig.audit.read_all().unwrap().len(), entries.len());
        assert!(rig.audit.verify().unwrap().ok);
    }

    #[test]
    fn scenarios_run_clean() {
        super::scenarios::checkout::run_scenario().unwrap();
        super::scenarios::cancellation::run_scenario().unwrap();
        super::scenarios::refund::run_scenario().unwrap();
        super::scenarios::integrity::run_scenario().unwrap();
    }
}
