//! Reconciliation state machine.
//!
//! The single component allowed to write a token's final status. Candidate
//! statuses arrive from four independent sources (browser return, browser
//! cancel, server notification, poll fallback) in any order, possibly
//! replayed; the engine funnels them through the store's compare-and-set so
//! the first terminal writer wins and every later signal becomes an
//! idempotent no-op.

use crate::error::ReconcileError;
use crate::store::{ApplyOutcome, TransactionStore};
use crate::types::{PaymentStatus, SignalSource};
use std::sync::Arc;
use tracing::{debug, info};

/// What the return endpoint should show the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDisposition {
    /// The record is still pending; present a waiting state. No status was
    /// written.
    Waiting,
    /// The record has already settled; the caller directs the user to their
    /// purchase rather than writing anything.
    Settled(PaymentStatus),
}

pub struct ReconcileEngine {
    store: Arc<dyn TransactionStore>,
}

impl ReconcileEngine {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Apply a candidate status for `token`.
    ///
    /// Returns the status now in effect: the candidate when it was written,
    /// or the pre-existing terminal status when the record had already
    /// settled. Duplicate deliveries therefore succeed with the settled
    /// status instead of erroring, which is what retrying gateways expect.
    pub async fn apply(
        &self,
        token: &str,
        candidate: PaymentStatus,
        source: SignalSource,
    ) -> Result<PaymentStatus, ReconcileError> {
        match self.store.apply_final_status(token, candidate).await? {
            ApplyOutcome::Applied => {
                info!(
                    token = %token,
                    status = %candidate,
                    source = %source,
                    "payment status applied"
                );
                Ok(candidate)
            }
            ApplyOutcome::AlreadyTerminal(existing) => {
                debug!(
                    token = %token,
                    candidate = %candidate,
                    existing = %existing,
                    source = %source,
                    "record already terminal, signal ignored"
                );
                Ok(existing)
            }
            ApplyOutcome::UnknownToken => Err(ReconcileError::UnknownToken {
                token: token.to_string(),
            }),
        }
    }

    /// Handle the browser return signal.
    ///
    /// Purely informational: re-applying Pending is a no-op write, and the
    /// store's compare-and-set answers atomically whether the record had
    /// already settled. A terminal write racing the return therefore shows
    /// up as a settled disposition, never as a stale waiting state.
    pub async fn handle_return(&self, token: &str) -> Result<ReturnDisposition, ReconcileError> {
        let status = self
            .apply(token, PaymentStatus::Pending, SignalSource::Return)
            .await?;

        if status.is_terminal() {
            Ok(ReturnDisposition::Settled(status))
        } else {
            Ok(ReturnDisposition::Waiting)
        }
    }
}
