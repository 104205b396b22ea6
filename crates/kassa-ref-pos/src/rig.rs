//! A fully wired ledger for scenarios and end-to-end tests.

use kassa_audit::InMemoryAuditLog;
use kassa_core::{config::LedgerConfig, memory::InMemoryTransactionStore, Ledger};
use kassa_counter::InMemoryCounterStore;

use crate::mocks::{MockPaymentProvider, MockTse};

/// A ledger plus handles to its audit chain and mock collaborators.
///
/// The ledger owns boxed clones; the rig keeps the other handle of each so
/// callers can script the provider, flip the TSE offline, and inspect or
/// verify the chain after driving operations.
pub struct PosRig {
    pub ledger: Ledger,
    pub audit: InMemoryAuditLog,
    pub provider: MockPaymentProvider,
    pub tse: MockTse,
}

impl PosRig {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let audit = InMemoryAuditLog::new();
        let provider = MockPaymentProvider::new();
        let tse = MockTse::new();

        let ledger = Ledger::new(
            Box::new(InMemoryTransactionStore::new()),
            Box::new(audit.clone()),
            Box::new(InMemoryCounterStore::new()),
            Box::new(provider.clone()),
            Box::new(tse.clone()),
            config,
        );

        Self { ledger, audit, provider, tse }
    }
}

impl Default for PosRig {
    fn default() -> Self {
        Self::new()
    }
}
