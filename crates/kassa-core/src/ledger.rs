//! The transaction ledger: the state machine governing a POS transaction's
//! lifecycle.
//!
//! Every state-changing operation follows the same contract:
//!
//!   validate status → mutate (optimistic versioned write) → allocate a
//!   sequence number if the action is numbered → append the audit entry
//!
//! Success is only reported after the audit entry is durably appended. If
//! the append fails, the ledger restores the pre-transition snapshot (or
//! discards a freshly inserted transaction) before propagating the error,
//! so no unaudited mutation stays visible. A `ConcurrencyConflict` on the
//! versioned write is retried from a fresh snapshot, bounded by
//! `LedgerConfig::max_transition_retries`.

use chrono::{Datelike, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use kassa_contracts::{
    audit::{AuditAction, AuditEntry, AuditRecord},
    counter::CounterScope,
    error::{KassaError, KassaResult},
    transaction::{ActorId, PaymentRecord, Transaction, TransactionId, TransactionStatus},
};

use crate::{
    config::LedgerConfig,
    provider::PaymentSignal,
    traits::{AuditSink, Fiscalizer, PaymentProvider, SequenceCounter, TransactionStore},
};

/// The central ledger wiring the trait seams together.
///
/// One `Ledger` serves many concurrent callers; all shared state lives
/// behind the trait implementations (the store's versioned writes, the
/// audit sink's serialized tail, the counters' atomic increments).
pub struct Ledger {
    store: Box<dyn TransactionStore>,
    audit: Box<dyn AuditSink>,
    counters: Box<dyn SequenceCounter>,
    provider: Box<dyn PaymentProvider>,
    fiscalizer: Box<dyn Fiscalizer>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(
        store: Box<dyn TransactionStore>,
        audit: Box<dyn AuditSink>,
        counters: Box<dyn SequenceCounter>,
        provider: Box<dyn PaymentProvider>,
        fiscalizer: Box<dyn Fiscalizer>,
        config: LedgerConfig,
    ) -> Self {
        Self { store, audit, counters, provider, fiscalizer, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Read-only fetch of a transaction's current state.
    pub fn transaction(&self, id: &TransactionId) -> KassaResult<Transaction> {
        self.store.get(id)
    }

    // ── Transition engine ────────────────────────────────────────────────────

    /// Run one guarded transition: load, validate, mutate, append.
    ///
    /// `mutate` receives the current snapshot and returns the mutated
    /// document plus the audit payload. It is re-invoked from a fresh
    /// snapshot on every optimistic-write retry, so it must be free of side
    /// effects — counter allocation happens in the caller, once, before the
    /// loop.
    fn run_transition<M>(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        action: &'static str,
        allowed: &[TransactionStatus],
        audit_action: AuditAction,
        mutate: M,
    ) -> KassaResult<Transaction>
    where
        M: Fn(&Transaction) -> KassaResult<(Transaction, serde_json::Value)>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;

            let current = self.store.get(id)?;
            if !allowed.contains(&current.status) {
                return Err(KassaError::InvalidTransition {
                    from: current.status,
                    action: action.to_string(),
                });
            }

            let (mutated, payload) = mutate(&current)?;

            let stored = match self.store.update(&mutated) {
                Ok(stored) => stored,
                Err(KassaError::ConcurrencyConflict { resource }) => {
                    if attempts < self.config.max_transition_retries {
                        debug!(
                            action,
                            transaction = %id,
                            attempt = attempts,
                            "optimistic write conflicted, retrying from fresh snapshot"
                        );
                        continue;
                    }
                    return Err(KassaError::ConcurrencyConflict { resource });
                }
                Err(other) => return Err(other),
            };

            let record = AuditRecord::new(actor.clone(), audit_action)
                .for_transaction(id.clone())
                .with_payload(payload);

            match self.audit.append(&record) {
                Ok(entry) => {
                    info!(
                        action,
                        transaction = %id,
                        status = %stored.status,
                        sequence = entry.sequence,
                        "ledger transition committed"
                    );
                    return Ok(stored);
                }
                Err(append_err) => {
                    // The mutation must not stay visible without its audit
                    // entry. Restore the pre-transition snapshot at the new
                    // version.
                    let mut rollback = current.clone();
                    rollback.version = stored.version;
                    if let Err(rollback_err) = self.store.update(&rollback) {
                        warn!(
                            action,
                            transaction = %id,
                            error = %rollback_err,
                            "rollback after failed audit append also failed"
                        );
                    }
                    return Err(append_err);
                }
            }
        }
    }

    // ── Lifecycle operations ─────────────────────────────────────────────────

    /// Open a new transaction in `Created` and record `CREATE_TX`.
    pub fn create_transaction(
        &self,
        actor: &ActorId,
        price_cents: u64,
        currency: impl Into<String>,
    ) -> KassaResult<Transaction> {
        let tx = Transaction::new(price_cents, currency);
        self.store.insert(&tx)?;

        let record = AuditRecord::new(actor.clone(), AuditAction::CreateTx)
            .for_transaction(tx.id.clone())
            .with_payload(json!({
                "price_cents": tx.price_cents,
                "currency": tx.currency,
            }));

        if let Err(append_err) = self.audit.append(&record) {
            // A transaction without its CREATE_TX entry never existed.
            if let Err(rollback_err) = self.store.discard(&tx.id) {
                warn!(
                    transaction = %tx.id,
                    error = %rollback_err,
                    "discard after failed audit append also failed"
                );
            }
            return Err(append_err);
        }

        info!(transaction = %tx.id, price_cents = tx.price_cents, "transaction created");
        Ok(tx)
    }

    /// Like [`create_transaction`], priced in the configured default
    /// currency.
    ///
    /// [`create_transaction`]: Ledger::create_transaction
    pub fn create_transaction_default(
        &self,
        actor: &ActorId,
        price_cents: u64,
    ) -> KassaResult<Transaction> {
        let currency = self.config.default_currency.clone();
        self.create_transaction(actor, price_cents, currency)
    }

    /// Change the price of a not-yet-charged transaction. `Created` only.
    pub fn update_price(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        new_price_cents: u64,
    ) -> KassaResult<Transaction> {
        self.run_transition(
            actor,
            id,
            "update_price",
            &[TransactionStatus::Created],
            AuditAction::UpdatePrice,
            move |current| {
                let mut next = current.clone();
                next.price_cents = new_price_cents;
                let payload = json!({
                    "old_price_cents": current.price_cents,
                    "new_price_cents": new_price_cents,
                });
                Ok((next, payload))
            },
        )
    }

    /// Hand the transaction to a payment provider: `created →
    /// payment_pending`.
    pub fn request_payment(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        provider: &str,
        provider_tx_id: &str,
    ) -> KassaResult<Transaction> {
        let provider = provider.to_string();
        let provider_tx_id = provider_tx_id.to_string();
        self.run_transition(
            actor,
            id,
            "request_payment",
            &[TransactionStatus::Created],
            AuditAction::PaymentStatusUpdate,
            move |current| {
                let mut next = current.clone();
                next.status = TransactionStatus::PaymentPending;
                next.payment = Some(PaymentRecord {
                    provider: provider.clone(),
                    provider_tx_id: provider_tx_id.clone(),
                    approved_at: None,
                });
                let payload = json!({
                    "from": current.status.as_str(),
                    "to": TransactionStatus::PaymentPending.as_str(),
                    "provider": provider,
                    "provider_tx_id": provider_tx_id,
                });
                Ok((next, payload))
            },
        )
    }

    /// Abandon a pending payment attempt: `payment_pending → created`.
    pub fn retry_payment(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        self.run_transition(
            actor,
            id,
            "retry_payment",
            &[TransactionStatus::PaymentPending],
            AuditAction::PaymentStatusUpdate,
            |current| {
                let mut next = current.clone();
                next.status = TransactionStatus::Created;
                next.payment = None;
                let payload = json!({
                    "from": current.status.as_str(),
                    "to": TransactionStatus::Created.as_str(),
                    "reason": "payment retry",
                });
                Ok((next, payload))
            },
        )
    }

    /// Confirm a completed payment: `payment_pending → paid`.
    ///
    /// After the transition commits, the fiscalization device is asked to
    /// finish the fiscal transaction. A device failure never reverts the
    /// payment — the transaction is flagged for manual `tse_finish` retry.
    pub fn confirm_paid(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        let paid = self.run_transition(
            actor,
            id,
            "confirm_paid",
            &[TransactionStatus::PaymentPending],
            AuditAction::PaymentMarkPaid,
            |current| {
                let payment = current.payment.as_ref().ok_or_else(|| {
                    KassaError::PersistenceError {
                        reason: format!(
                            "payment_pending transaction '{}' has no payment record",
                            current.id
                        ),
                    }
                })?;
                let mut next = current.clone();
                let mut approved = payment.clone();
                approved.approved_at = Some(Utc::now());
                next.status = TransactionStatus::Paid;
                next.payment = Some(approved);
                let payload = json!({
                    "from": current.status.as_str(),
                    "to": TransactionStatus::Paid.as_str(),
                    "provider_tx_id": payment.provider_tx_id,
                });
                Ok((next, payload))
            },
        )?;

        if let Err(fiscal_err) = self.fiscalizer.finish(&paid, actor) {
            warn!(
                transaction = %id,
                error = %fiscal_err,
                "fiscalization finish failed after payment, flagging for manual retry"
            );
            self.flag_fiscal_retry(id);
            return self.store.get(id);
        }

        Ok(paid)
    }

    /// Cancel an uncharged transaction. Legal from `created` and
    /// `payment_pending` only — paid transactions are refunded or storno'd,
    /// never cancelled.
    pub fn cancel(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        self.run_transition(
            actor,
            id,
            "cancel",
            &[TransactionStatus::Created, TransactionStatus::PaymentPending],
            AuditAction::Cancel,
            |current| {
                let mut next = current.clone();
                next.status = TransactionStatus::Cancelled;
                let payload = json!({
                    "from": current.status.as_str(),
                    "to": TransactionStatus::Cancelled.as_str(),
                });
                Ok((next, payload))
            },
        )
    }

    /// Refund a paid transaction. Terminal; the amount may not exceed the
    /// original price.
    pub fn refund(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        amount_cents: u64,
    ) -> KassaResult<Transaction> {
        self.run_transition(
            actor,
            id,
            "refund",
            &[TransactionStatus::Paid],
            AuditAction::Refund,
            move |current| {
                if amount_cents > current.price_cents {
                    return Err(KassaError::RefundExceedsPrice {
                        amount_cents,
                        price_cents: current.price_cents,
                    });
                }
                let mut next = current.clone();
                next.status = TransactionStatus::Refunded;
                let payload = json!({
                    "amount_cents": amount_cents,
                    "price_cents": current.price_cents,
                });
                Ok((next, payload))
            },
        )
    }

    /// Same-day correction of a paid transaction, distinct from a refund.
    /// Terminal.
    pub fn storno(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        self.run_transition(
            actor,
            id,
            "storno",
            &[TransactionStatus::Paid],
            AuditAction::Storno,
            |current| {
                let mut next = current.clone();
                next.status = TransactionStatus::Storno;
                let payload = json!({ "price_cents": current.price_cents });
                Ok((next, payload))
            },
        )
    }

    // ── Numbered documents ───────────────────────────────────────────────────

    /// Issue the fiscal receipt for a paid transaction.
    ///
    /// Allocates the next receipt number for the current year and stamps it
    /// on the transaction. A transaction gets exactly one receipt.
    pub fn issue_receipt(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        self.issue_numbered(
            actor,
            id,
            "issue_receipt",
            CounterScope::Receipt,
            AuditAction::IssueReceipt,
        )
    }

    /// Issue the invoice for a paid transaction. One invoice per
    /// transaction.
    pub fn issue_invoice(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        self.issue_numbered(
            actor,
            id,
            "issue_invoice",
            CounterScope::Invoice,
            AuditAction::IssueInvoice,
        )
    }

    fn issue_numbered(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        action: &'static str,
        scope: CounterScope,
        audit_action: AuditAction,
    ) -> KassaResult<Transaction> {
        // Validate before allocating so an illegal call never burns a
        // number.
        let current = self.store.get(id)?;
        if current.status != TransactionStatus::Paid {
            return Err(KassaError::InvalidTransition {
                from: current.status,
                action: action.to_string(),
            });
        }
        Self::check_not_issued(&current, scope)?;

        // Allocated exactly once; retries of the versioned write below
        // reuse the same number.
        let number = self.counters.next(scope, Utc::now().year())?;

        self.run_transition(actor, id, action, &[TransactionStatus::Paid], audit_action, {
            move |current: &Transaction| {
                Self::check_not_issued(current, scope)?;
                let mut next = current.clone();
                let payload = match scope {
                    CounterScope::Receipt => {
                        next.receipt_no = Some(number);
                        json!({ "receipt_no": number })
                    }
                    CounterScope::Invoice => {
                        next.invoice_no = Some(number);
                        json!({ "invoice_no": number })
                    }
                    CounterScope::AuditHash => {
                        return Err(KassaError::PersistenceError {
                            reason: "audit_hash counter cannot stamp a transaction".to_string(),
                        })
                    }
                };
                Ok((next, payload))
            }
        })
    }

    fn check_not_issued(tx: &Transaction, scope: CounterScope) -> KassaResult<()> {
        let issued = match scope {
            CounterScope::Receipt => tx.receipt_no,
            CounterScope::Invoice => tx.invoice_no,
            CounterScope::AuditHash => None,
        };
        if let Some(number) = issued {
            return Err(KassaError::AlreadyIssued {
                document: scope.as_str().to_string(),
                number,
            });
        }
        Ok(())
    }

    // ── Administrative and fiscalization actions ─────────────────────────────

    /// Record a contract signature against a live transaction.
    ///
    /// Audit-only: no status change. Legal from any non-terminal status.
    pub fn sign_contract(
        &self,
        actor: &ActorId,
        id: &TransactionId,
        details: serde_json::Value,
    ) -> KassaResult<AuditEntry> {
        let current = self.store.get(id)?;
        if current.status.is_terminal() {
            return Err(KassaError::InvalidTransition {
                from: current.status,
                action: "sign_contract".to_string(),
            });
        }

        let record = AuditRecord::new(actor.clone(), AuditAction::SignContract)
            .for_transaction(id.clone())
            .with_payload(details);
        let entry = self.audit.append(&record)?;
        info!(transaction = %id, "contract signature recorded");
        Ok(entry)
    }

    /// Open a fiscal transaction on the TSE device and record `TSE_START`.
    ///
    /// In strict fiscal mode a device failure propagates; otherwise it is
    /// recorded in the audit payload and logged.
    pub fn tse_start(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<AuditEntry> {
        let current = self.store.get(id)?;
        let allowed = [TransactionStatus::Created, TransactionStatus::PaymentPending];
        if !allowed.contains(&current.status) {
            return Err(KassaError::InvalidTransition {
                from: current.status,
                action: "tse_start".to_string(),
            });
        }

        let payload = match self.fiscalizer.start(&current, actor) {
            Ok(()) => json!({ "ok": true }),
            Err(fiscal_err) => {
                if self.config.fiscal.strict {
                    return Err(fiscal_err);
                }
                warn!(transaction = %id, error = %fiscal_err, "TSE start failed");
                json!({ "ok": false, "error": fiscal_err.to_string() })
            }
        };

        let record = AuditRecord::new(actor.clone(), AuditAction::TseStart)
            .for_transaction(id.clone())
            .with_payload(payload);
        self.audit.append(&record)
    }

    /// Finish fiscalization for a paid transaction and record `TSE_FINISH`.
    ///
    /// This is the manual-retry path for a payment whose implicit
    /// fiscalization failed: on success the `fiscal_sync_pending` flag is
    /// cleared.
    pub fn tse_finish(&self, actor: &ActorId, id: &TransactionId) -> KassaResult<Transaction> {
        let current = self.store.get(id)?;
        if current.status != TransactionStatus::Paid {
            return Err(KassaError::InvalidTransition {
                from: current.status,
                action: "tse_finish".to_string(),
            });
        }

        if let Err(fiscal_err) = self.fiscalizer.finish(&current, actor) {
            if self.config.fiscal.strict {
                return Err(fiscal_err);
            }
            warn!(transaction = %id, error = %fiscal_err, "TSE finish failed");
            let record = AuditRecord::new(actor.clone(), AuditAction::TseFinish)
                .for_transaction(id.clone())
                .with_payload(json!({ "ok": false, "error": fiscal_err.to_string() }));
            self.audit.append(&record)?;
            return self.store.get(id);
        }

        self.run_transition(
            actor,
            id,
            "tse_finish",
            &[TransactionStatus::Paid],
            AuditAction::TseFinish,
            |current| {
                let mut next = current.clone();
                next.fiscal_sync_pending = false;
                Ok((next, json!({ "ok": true })))
            },
        )
    }

    /// Poll the payment provider and drive the matching transition.
    ///
    /// `payment_pending` only. An approved payment confirms, a declined or
    /// aborted one cancels, a pending one changes nothing.
    pub fn sync_payment_status(
        &self,
        actor: &ActorId,
        id: &TransactionId,
    ) -> KassaResult<Transaction> {
        let current = self.store.get(id)?;
        if current.status != TransactionStatus::PaymentPending {
            return Err(KassaError::InvalidTransition {
                from: current.status,
                action: "sync_payment_status".to_string(),
            });
        }
        let payment = current.payment.as_ref().ok_or_else(|| KassaError::PersistenceError {
            reason: format!("payment_pending transaction '{}' has no payment record", id),
        })?;

        let status = self.provider.payment_status(&payment.provider_tx_id)?;
        debug!(transaction = %id, provider_status = ?status, "provider status polled");

        match status.signal() {
            PaymentSignal::Confirm => self.confirm_paid(actor, id),
            PaymentSignal::Abort => self.cancel(actor, id),
            PaymentSignal::Wait => Ok(current),
        }
    }

    /// Best-effort marking of a paid transaction whose fiscalization is
    /// still owed. Failure here is logged, never propagated — the payment
    /// itself is already committed and audited.
    fn flag_fiscal_retry(&self, id: &TransactionId) {
        for _ in 0..self.config.max_transition_retries {
            let current = match self.store.get(id) {
                Ok(tx) => tx,
                Err(_) => break,
            };
            let mut flagged = current;
            flagged.fiscal_sync_pending = true;
            match self.store.update(&flagged) {
                Ok(_) => return,
                Err(KassaError::ConcurrencyConflict { .. }) => continue,
                Err(_) => break,
            }
        }
        warn!(transaction = %id, "failed to flag transaction for manual fiscalization retry");
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
