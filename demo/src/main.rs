//! KASSA Point-of-Sale Reference — Demo CLI
//!
//! Runs one or all of the four POS demo scenarios.  Each scenario uses real
//! KASSA components (transaction ledger, hash-chained audit log, sequence
//! counters) wired together with mock payment and fiscal devices.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- checkout
//!   cargo run -p demo -- cancellation
//!   cargo run -p demo -- refund
//!   cargo run -p demo -- integrity

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kassa_ref_pos::scenarios::{cancellation, checkout, integrity, refund};

// ── CLI definition ────────────────────────────────────────────────────────────

/// KASSA — Tamper-evident point-of-sale ledger demo.
///
/// Each subcommand runs one or all of the four POS scenarios, demonstrating
/// the transaction lifecycle, numbered fiscal documents, and the hash-chained
/// audit trail.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "KASSA point-of-sale reference demo",
    long_about = "Runs KASSA POS demo scenarios showing the transaction lifecycle,\n\
                  payment provider integration, fiscal document numbering, and\n\
                  audit chain tamper evidence."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all four POS scenarios in sequence.
    RunAll,
    /// Scenario 1: Card Checkout (create → pay → receipt).
    Checkout,
    /// Scenario 2: Cancellation before payment (terminal-state rejection).
    Cancellation,
    /// Scenario 3: Refund with a TSE outage (fiscal retry flag).
    Refund,
    /// Scenario 4: Tamper Evidence (mutation guards + chain verification).
    Integrity,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging.  Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Checkout => checkout::run_scenario(),
        Command::Cancellation => cancellation::run_scenario(),
        Command::Refund => refund::run_scenario(),
        Command::Integrity => integrity::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> kassa_contracts::error::KassaResult<()> {
    checkout::run_scenario()?;
    cancellation::run_scenario()?;
    refund::run_scenario()?;
    integrity::run_scenario()?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("KASSA — Tamper-evident POS Ledger");
    println!("Point-of-Sale Reference Demo");
    println!("=================================");
    println!();
    println!("Every ledger operation runs the same pipeline:");
    println!("  [1] Lifecycle check: the transition table gates every status change");
    println!("  [2] Versioned store update with bounded retry on write conflicts");
    println!("  [3] Sequence counters issue gapless receipt and invoice numbers");
    println!("  [4] Immutable audit entry appended to the SHA-256 hash chain");
    println!();
}
