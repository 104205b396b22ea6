//! Scenario 4: Tamper evidence.
//!
//! Drives a short flow, then demonstrates the two integrity properties:
//! the store's mutation guards reject in-place changes outright, and an
//! out-of-band modification of a copied chain is pinpointed by
//! verification at the exact entry that was altered.

use serde_json::json;

use kassa_contracts::{error::KassaResult, transaction::ActorId};
use kassa_audit::verify_chain;
use kassa_core::traits::AuditSink;

use crate::rig::PosRig;

use super::print_trail;

pub fn run_scenario() -> KassaResult<()> {
    println!("=== Scenario 4: Tamper Evidence ===");
    println!();

    let rig = PosRig::new();
    let cashier = ActorId::new("cashier-ben");

    let tx = rig.ledger.create_transaction(&cashier, 2500, "EUR")?;
    rig.ledger.update_price(&cashier, &tx.id, 3000)?;
    rig.ledger.cancel(&cashier, &tx.id)?;

    let entries = rig.audit.read_all()?;
    print_trail(&entries);
    println!();

    // In-place mutation is rejected at the store boundary.
    match rig.audit.try_update(&entries[1].id, json!({ "new_price_cents": 1 })) {
        Err(err) => println!("  In-place update rejected: {}", err),
        Ok(()) => println!("  UNEXPECTED: audit entry was updated"),
    }
    match rig.audit.try_delete(&entries[2].id) {
        Err(err) => println!("  Deletion rejected: {}", err),
        Ok(()) => println!("  UNEXPECTED: audit entry was deleted"),
    }

    // An attacker editing a copy of the log is caught by verification.
    let mut tampered = entries.clone();
    tampered[1].payload = json!({ "old_price_cents": 2500, "new_price_cents": 1 });

    let verification = verify_chain(&tampered)?;
    println!();
    println!(
        "  Verification of tampered copy: {} (broken at entry {:?})",
        if verification.ok { "OK" } else { "BROKEN" },
        verification.broken_at
    );

    let untouched = rig.audit.verify()?;
    println!(
        "  Verification of the real chain: {}",
        if untouched.ok { "OK" } else { "BROKEN" }
    );
    println!();

    untouched.ensure_ok()?;
    Ok(())
}
