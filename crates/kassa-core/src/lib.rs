//! # kassa-core
//!
//! The transaction ledger runtime for the kassa POS system.
//!
//! This crate provides:
//! - The five trait seams (`TransactionStore`, `AuditSink`,
//!   `SequenceCounter`, `PaymentProvider`, `Fiscalizer`)
//! - The `Ledger` that wires them together and enforces the transition
//!   contract: validate → mutate → number → append, success only after the
//!   audit entry is durable
//! - The TOML-driven `LedgerConfig`
//! - A reference in-memory `TransactionStore` with optimistic versioned
//!   writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kassa_core::{Ledger, LedgerConfig, memory::InMemoryTransactionStore};
//! ```

pub mod config;
pub mod ledger;
pub mod memory;
pub mod provider;
pub mod traits;

pub use config::LedgerConfig;
pub use ledger::Ledger;
pub use provider::{PaymentSignal, ProviderStatus};
