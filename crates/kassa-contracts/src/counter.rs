//! Counter scopes for numbered fiscal documents.

use serde::{Deserialize, Serialize};

/// What a sequence counter numbers.
///
/// Counters are keyed by `(scope, period)` where the period is a calendar
/// year; receipt and invoice numbering restart per year, per fiscal custom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterScope {
    Receipt,
    Invoice,
    /// Numbering for periodic chain checkpoints.
    AuditHash,
}

impl CounterScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Invoice => "invoice",
            Self::AuditHash => "audit_hash",
        }
    }
}

impl std::fmt::Display for CounterScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
