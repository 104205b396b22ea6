//! Payment-provider status mapping.
//!
//! Providers report their own status vocabulary; the ledger reduces it to
//! the one question it cares about — confirm, keep waiting, or abort. The
//! mapping is total over the closed `ProviderStatus` enum so a new provider
//! status forces a deliberate decision here.

use serde::{Deserialize, Serialize};

/// Status of a payment attempt as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    /// The payment went through.
    Approved,
    /// Still processing; poll again later.
    Pending,
    /// The provider rejected the payment.
    Declined,
    /// The customer or terminal aborted the attempt.
    Aborted,
}

/// What the ledger should do with a provider status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSignal {
    /// Drive `payment_pending → paid`.
    Confirm,
    /// No transition; the attempt is still in flight.
    Wait,
    /// Drive `payment_pending → cancelled`.
    Abort,
}

impl ProviderStatus {
    /// Map the provider's vocabulary onto a ledger transition intent.
    pub fn signal(&self) -> PaymentSignal {
        match self {
            Self::Approved => PaymentSignal::Confirm,
            Self::Pending => PaymentSignal::Wait,
            Self::Declined | Self::Aborted => PaymentSignal::Abort,
        }
    }
}
