//! Core payment types shared across the gateway client, verifier and
//! reconciliation engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Internal payment status vocabulary.
///
/// This is the only vocabulary the reconciliation engine and the transaction
/// store understand. Gateway-specific status strings are translated into it
/// by the notification verifier before they reach the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    /// Terminal statuses are absorbing: once a record enters one, no later
    /// signal may override it.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Cancelled | PaymentStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which inbound path produced a candidate status.
///
/// Used for structured log fields; the reconciliation engine treats all
/// sources uniformly (first terminal writer wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    Initiate,
    Return,
    Cancel,
    Notify,
    Poll,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::Initiate => "initiate",
            SignalSource::Return => "return",
            SignalSource::Cancel => "cancel",
            SignalSource::Notify => "notify",
            SignalSource::Poll => "poll",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount and currency of a pending checkout attempt, as recorded by the
/// external transaction store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Charge {
    pub amount: Decimal,
    pub currency: String,
}
