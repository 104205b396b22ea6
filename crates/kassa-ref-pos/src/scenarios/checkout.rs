//! Scenario 1: Card checkout.
//!
//! The happy path of a POS sale: create the transaction, hand it to the
//! payment provider, poll until approved, issue the fiscal receipt. Ends
//! with a verified four-entry audit chain.

use serde_json::json;

use kassa_contracts::{error::KassaResult, transaction::ActorId};
use kassa_core::provider::ProviderStatus;
use kassa_core::traits::AuditSink;

use crate::rig::PosRig;

use super::print_trail;

pub fn run_scenario() -> KassaResult<()> {
    println!("=== Scenario 1: Card Checkout ===");
    println!();

    let rig = PosRig::new();
    let cashier = ActorId::new("cashier-anna");

    let tx = rig.ledger.create_transaction(&cashier, 4900, "EUR")?;
    println!("  Created transaction {} for 49.00 EUR", tx.id);

    rig.ledger.sign_contract(
        &cashier,
        &tx.id,
        json!({ "contract": "artist-commission", "artist": "m.keller" }),
    )?;
    println!("  Commission contract signed");

    rig.provider.script("card-0001", ProviderStatus::Approved);
    rig.ledger.request_payment(&cashier, &tx.id, "sumup", "card-0001")?;
    println!("  Payment requested via sumup (card-0001)");

    let paid = rig.ledger.sync_payment_status(&cashier, &tx.id)?;
    println!("  Provider reported approved → status {}", paid.status);

    let stamped = rig.ledger.issue_receipt(&cashier, &tx.id)?;
    println!(
        "  Receipt issued: number {} of the year",
        stamped.receipt_no.expect("receipt was just issued")
    );

    println!();
    print_trail(&rig.audit.read_all()?);

    let verification = rig.audit.verify()?;
    println!();
    println!(
        "  Chain verification: {}",
        if verification.ok { "OK" } else { "BROKEN" }
    );
    println!("  TSE calls: {:?}", rig.tse.calls());
    println!();

    verification.ensure_ok()?;
    Ok(())
}
