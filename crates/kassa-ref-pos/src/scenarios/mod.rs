//! Runnable reference scenarios.
//!
//! Each scenario wires a fresh `PosRig` and drives the ledger through one
//! realistic POS flow, printing the resulting audit trail and chain
//! verification outcome.

pub mod cancellation;
pub mod checkout;
pub mod integrity;
pub mod refund;

use kassa_contracts::audit::AuditEntry;

/// Print an audit trail the way the demo renders it.
pub(crate) fn print_trail(entries: &[AuditEntry]) {
    println!("  Audit trail ({} entries):", entries.len());
    for entry in entries {
        println!(
            "    #{} {:<24} hash {}…",
            entry.sequence,
            entry.action.as_str(),
            &entry.this_hash[..12]
        );
    }
}
