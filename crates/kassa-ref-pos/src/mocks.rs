//! Simulated external collaborators for the reference POS rig.
//!
//! No external systems are contacted. `MockPaymentProvider` stands in for
//! the card terminal backend, `MockTse` for the certified fiscalization
//! device. Both are cheaply cloneable handles over shared state so a
//! scenario can keep one handle while the ledger owns another.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use kassa_contracts::{
    error::{KassaError, KassaResult},
    transaction::{ActorId, Transaction},
};
use kassa_core::{
    provider::ProviderStatus,
    traits::{Fiscalizer, PaymentProvider},
};

// ── Payment provider ──────────────────────────────────────────────────────────

/// A payment provider that answers from a scripted status table.
///
/// Unknown provider transaction ids produce `ProviderError`, the same way
/// a real backend rejects a lookup for a payment it never saw.
#[derive(Clone, Default)]
pub struct MockPaymentProvider {
    responses: Arc<Mutex<HashMap<String, ProviderStatus>>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the status the provider reports for a payment attempt.
    pub fn script(&self, provider_tx_id: &str, status: ProviderStatus) {
        self.responses
            .lock()
            .expect("mock provider lock poisoned")
            .insert(provider_tx_id.to_string(), status);
    }
}

impl PaymentProvider for MockPaymentProvider {
    fn payment_status(&self, provider_tx_id: &str) -> KassaResult<ProviderStatus> {
        self.responses
            .lock()
            .expect("mock provider lock poisoned")
            .get(provider_tx_id)
            .copied()
            .ok_or_else(|| KassaError::ProviderError {
                reason: format!("unknown payment '{}'", provider_tx_id),
            })
    }
}

// ── TSE device ────────────────────────────────────────────────────────────────

/// A fiscalization device with a switchable failure mode and a call log.
#[derive(Clone, Default)]
pub struct MockTse {
    fail_finish: Arc<AtomicBool>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `finish` calls fail, simulating an offline device.
    pub fn set_offline(&self, offline: bool) {
        self.fail_finish.store(offline, Ordering::SeqCst);
    }

    /// The device calls made so far, e.g. `"start <id>"`, `"finish <id>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("mock TSE lock poisoned").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("mock TSE lock poisoned").push(call);
    }
}

impl Fiscalizer for MockTse {
    fn start(&self, tx: &Transaction, _actor: &ActorId) -> KassaResult<()> {
        self.record(format!("start {}", tx.id));
        Ok(())
    }

    fn finish(&self, tx: &Transaction, _actor: &ActorId) -> KassaResult<()> {
        self.record(format!("finish {}", tx.id));
        if self.fail_finish.load(Ordering::SeqCst) {
            return Err(KassaError::FiscalizationFailed {
                reason: "TSE device offline".to_string(),
            });
        }
        Ok(())
    }
}
