//! Scenario 2: Cancellation before payment.
//!
//! A sale is priced, re-priced, and cancelled before any money moves.
//! Afterwards a refund attempt is rejected — cancelled is terminal — and
//! the rejection names both the current status and the attempted action.

use kassa_contracts::{error::KassaResult, transaction::ActorId};
use kassa_core::traits::AuditSink;

use crate::rig::PosRig;

use super::print_trail;

pub fn run_scenario() -> KassaResult<()> {
    println!("=== Scenario 2: Cancellation Before Payment ===");
    println!();

    let rig = PosRig::new();
    let cashier = ActorId::new("cashier-ben");

    let tx = rig.ledger.create_transaction_default(&cashier, 12000)?;
    println!("  Created transaction {} for 120.00 {}", tx.id, tx.currency);

    rig.ledger.update_price(&cashier, &tx.id, 10500)?;
    println!("  Price corrected to 105.00 EUR");

    let cancelled = rig.ledger.cancel(&cashier, &tx.id)?;
    println!("  Cancelled → status {}", cancelled.status);

    match rig.ledger.refund(&cashier, &tx.id, 10500) {
        Err(err) => println!("  Refund attempt rejected: {}", err),
        Ok(_) => println!("  UNEXPECTED: refund of a cancelled transaction succeeded"),
    }

    println!();
    print_trail(&rig.audit.read_all()?);

    let verification = rig.audit.verify()?;
    println!();
    println!(
        "  Chain verification: {}",
        if verification.ok { "OK" } else { "BROKEN" }
    );
    println!();

    verification.ensure_ok()?;
    Ok(())
}
