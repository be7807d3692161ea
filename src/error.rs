//! Error taxonomy for the reconciliation core.
//!
//! Propagation policy: transport and verification failures are never
//! escalated to Completed or Cancelled. The only safe default on a
//! verification failure is Pending; only initiate-time failures (where no
//! redirect can be offered to the user) map to Failed.

use crate::types::PaymentStatus;

/// Failures talking to the remote gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The outbound call failed at the transport level (or timed out).
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The gateway answered but did not accept the transaction.
    #[error("gateway rejected transaction: status={status}")]
    Rejected { status: String },

    /// The gateway answered with a body we cannot interpret.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),

    /// Caller supplied an empty poll URL; no network call was attempted.
    #[error("poll url must not be empty")]
    InvalidPollUrl,
}

/// Failures verifying an inbound notification payload.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationError {
    /// The recomputed signature does not match the payload's. Proof that
    /// the signal is untrustworthy, not proof that the payment failed.
    #[error("notification signature mismatch")]
    SignatureMismatch,

    /// Payload is missing a field required before verification can run.
    #[error("malformed notification payload: missing {missing}")]
    MalformedPayload { missing: &'static str },
}

/// Failures from the transaction store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transaction store unavailable: {0}")]
    Backend(String),
}

/// Failures applying a candidate status.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// No pending attempt exists for this token. The attempt must be created
    /// by the commerce collaborator before any payment signal can arrive;
    /// reconciliation never creates records.
    #[error("unknown payment token: {token}")]
    UnknownToken { token: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Umbrella error for the HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Gateway(GatewayError::Unreachable(_)) => 502,
            AppError::Gateway(GatewayError::Rejected { .. }) => 502,
            AppError::Gateway(GatewayError::MalformedResponse(_)) => 502,
            AppError::Gateway(GatewayError::InvalidPollUrl) => 400,
            AppError::Reconcile(ReconcileError::UnknownToken { .. }) => 404,
            AppError::Reconcile(ReconcileError::Store(_)) => 503,
            AppError::Store(_) => 503,
            AppError::BadRequest(_) => 400,
        }
    }

    /// Terminal status to record locally when this error aborts checkout.
    /// Initiate failures leave the user with no redirect, so the attempt is
    /// marked Failed; everything else stays Pending.
    pub fn checkout_status(&self) -> Option<PaymentStatus> {
        match self {
            AppError::Gateway(GatewayError::Unreachable(_))
            | AppError::Gateway(GatewayError::Rejected { .. })
            | AppError::Gateway(GatewayError::MalformedResponse(_)) => {
                Some(PaymentStatus::Failed)
            }
            _ => None,
        }
    }
}
