//! Transaction store collaborator interface.
//!
//! The reconciliation core does not own payment records; the surrounding
//! commerce system does. This trait is the narrow seam the core requires
//! from it: look up a pending charge by token, and apply a final status with
//! compare-and-set semantics.

pub mod memory;

use crate::types::{Charge, PaymentStatus};
use crate::error::StoreError;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryStore;

/// Result of a status write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The candidate status was written.
    Applied,
    /// The record was already terminal; the stored status is returned
    /// unchanged. Not an error: duplicate signals are expected.
    AlreadyTerminal(PaymentStatus),
    /// No record exists for this token.
    UnknownToken,
}

/// A pending attempt eligible for the poll fallback.
#[derive(Debug, Clone)]
pub struct PendingAttempt {
    pub token: String,
    pub poll_url: Option<String>,
}

/// Storage seam between the reconciliation core and the commerce system.
///
/// `apply_final_status` must be atomic: the write may only succeed while the
/// current status is non-terminal, so that two concurrent terminal writers
/// can never both observe non-terminal state. Implementations back this with
/// a single-writer transaction or an equivalent compare-and-set.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Amount and currency for a token whose attempt is still pending.
    /// `None` when the token is unknown or the attempt has already
    /// progressed past its initial state.
    async fn lookup_pending_charge(&self, token: &str) -> Result<Option<Charge>, StoreError>;

    /// Current status for a token, `None` when unknown.
    async fn status(&self, token: &str) -> Result<Option<PaymentStatus>, StoreError>;

    /// Compare-and-set status write; see trait docs.
    async fn apply_final_status(
        &self,
        token: &str,
        status: PaymentStatus,
    ) -> Result<ApplyOutcome, StoreError>;

    /// Remember the gateway poll URL returned at initiate time so the poll
    /// fallback can query the attempt later.
    async fn record_poll_url(&self, token: &str, poll_url: &str) -> Result<(), StoreError>;

    /// Pending attempts older than `older_than`, for the poll fallback.
    async fn stale_pending(&self, older_than: Duration)
        -> Result<Vec<PendingAttempt>, StoreError>;
}
