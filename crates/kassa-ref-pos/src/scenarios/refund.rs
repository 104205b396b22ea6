//! Scenario 3: Refund of a paid sale, with a fiscalization hiccup.
//!
//! The TSE device is offline when the payment confirms: the payment stays
//! committed, the transaction is flagged for manual fiscalization, and a
//! later `tse_finish` clears the flag. The sale is then refunded in full;
//! a storno attempt afterwards is rejected because refunded is terminal.

use kassa_contracts::{error::KassaResult, transaction::ActorId};
use kassa_core::traits::AuditSink;

use crate::rig::PosRig;

use super::print_trail;

pub fn run_scenario() -> KassaResult<()> {
    println!("=== Scenario 3: Refund With TSE Outage ===");
    println!();

    let rig = PosRig::new();
    let cashier = ActorId::new("cashier-anna");

    let tx = rig.ledger.create_transaction(&cashier, 8000, "EUR")?;
    rig.ledger.request_payment(&cashier, &tx.id, "zettle", "card-0042")?;
    println!("  Created transaction {} and requested payment", tx.id);

    rig.tse.set_offline(true);
    let paid = rig.ledger.confirm_paid(&cashier, &tx.id)?;
    println!(
        "  Payment confirmed with TSE offline → status {}, fiscal retry pending: {}",
        paid.status, paid.fiscal_sync_pending
    );

    rig.tse.set_offline(false);
    let synced = rig.ledger.tse_finish(&cashier, &tx.id)?;
    println!(
        "  Manual TSE finish succeeded → fiscal retry pending: {}",
        synced.fiscal_sync_pending
    );

    let refunded = rig.ledger.refund(&cashier, &tx.id, 8000)?;
    println!("  Refunded 80.00 EUR → status {}", refunded.status);

    match rig.ledger.storno(&cashier, &tx.id) {
        Err(err) => println!("  Storno attempt rejected: {}", err),
        Ok(_) => println!("  UNEXPECTED: storno of a refunded transaction succeeded"),
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
