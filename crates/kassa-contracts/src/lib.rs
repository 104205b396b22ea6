//! # kassa-contracts
//!
//! Shared types and error contracts for the kassa POS ledger.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, the transition relation, and the
//! unified error type.

pub mod audit;
pub mod counter;
pub mod error;
pub mod transaction;
