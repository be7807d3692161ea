//! Payment signal handlers: checkout, return, cancel, notify.

use super::AppState;
use crate::encoding;
use crate::error::{AppError, ReconcileError, VerificationError};
use crate::gateway::client::SUPPORTED_CURRENCIES;
use crate::gateway::InitiateRequest;
use crate::notify::REFERENCE_FIELD;
use crate::reconcile::ReturnDisposition;
use crate::types::{PaymentStatus, SignalSource};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub token: String,
    pub buyer_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Gateway checkout page; the caller must redirect the user here and
    /// must not treat the payment as resolved.
    pub redirect_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ReturnResponse {
    /// "waiting" while the attempt is still pending, "settled" once the
    /// record has progressed; the view layer picks the page accordingly.
    pub disposition: &'static str,
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Status now in effect. A cancel arriving after the gateway reported
    /// success yields `completed`, not `cancelled`.
    pub status: PaymentStatus,
}

/// POST /payments/checkout — initiate a transaction at the gateway.
pub async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let token = request.token.trim().to_string();
    if token.is_empty() {
        return Err(AppError::BadRequest("empty payment token".to_string()));
    }

    let charge = state
        .store
        .lookup_pending_charge(&token)
        .await?
        .ok_or_else(|| ReconcileError::UnknownToken {
            token: token.clone(),
        })?;

    if !SUPPORTED_CURRENCIES.contains(&charge.currency.as_str()) {
        return Err(AppError::BadRequest(format!(
            "currency {} is not supported by this payment method",
            charge.currency
        )));
    }

    let initiate = InitiateRequest {
        token: token.clone(),
        amount: charge.amount,
        return_url: with_token(&state.gateway.return_url, &token),
        result_url: state.gateway.result_url.clone(),
        buyer_email: request.buyer_email.clone(),
    };

    match state.client.initiate(&initiate).await {
        Ok(response) => {
            if let Some(poll_url) = &response.poll_url {
                state.store.record_poll_url(&token, poll_url).await?;
            }
            info!(token = %token, "checkout initiated, redirecting to gateway");
            Ok(Json(CheckoutResponse {
                redirect_url: response.browser_url,
            }))
        }
        Err(gateway_err) => {
            let app_err: AppError = gateway_err.into();
            // No redirect can be offered, so the attempt is marked Failed
            // locally before the error is surfaced.
            if let Some(status) = app_err.checkout_status() {
                if let Err(apply_err) = state
                    .engine
                    .apply(&token, status, SignalSource::Initiate)
                    .await
                {
                    error!(token = %token, error = %apply_err, "failed to record initiate failure");
                }
            }
            Err(app_err)
        }
    }
}

/// GET /payments/return — the user's browser came back from the gateway.
pub async fn payment_return(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Json<ReturnResponse>, AppError> {
    let token = params.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("empty payment token".to_string()));
    }

    let response = match state.engine.handle_return(token).await? {
        ReturnDisposition::Waiting => ReturnResponse {
            disposition: "waiting",
            status: PaymentStatus::Pending,
        },
        ReturnDisposition::Settled(status) => ReturnResponse {
            disposition: "settled",
            status,
        },
    };
    Ok(Json(response))
}

/// GET /payments/cancel — the user abandoned checkout at the gateway.
pub async fn payment_cancel(
    State(state): State<AppState>,
    Query(params): Query<TokenParams>,
) -> Result<Json<CancelResponse>, AppError> {
    let token = params.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("empty payment token".to_string()));
    }

    let status = state
        .engine
        .apply(token, PaymentStatus::Cancelled, SignalSource::Cancel)
        .await?;
    Ok(Json(CancelResponse { status }))
}

/// POST /payments/notify — server-to-server notification from the gateway.
///
/// Always acknowledges with 200: the gateway treats any HTTP-level failure
/// as "not received" and retries relentlessly. An unverifiable or unknown
/// notification is logged and the local record stays Pending for the poll
/// fallback to settle; it is never escalated to a terminal status.
pub async fn payment_notify(State(state): State<AppState>, body: String) -> (StatusCode, &'static str) {
    let payload = encoding::parse(&body);

    match state.verifier.verify_and_map(&payload) {
        Ok(notification) => {
            match state
                .engine
                .apply(&notification.token, notification.status, SignalSource::Notify)
                .await
            {
                Ok(applied) => {
                    info!(
                        token = %notification.token,
                        gateway_status = %notification.raw_status,
                        applied = %applied,
                        "notification reconciled"
                    );
                }
                Err(ReconcileError::UnknownToken { token }) => {
                    warn!(token = %token, "notification for unknown token ignored");
                }
                Err(err) => {
                    error!(token = %notification.token, error = %err, "failed to apply notification");
                }
            }
        }
        Err(VerificationError::SignatureMismatch) => {
            warn!("notification signature mismatch, falling back to pending");
            // The reference cannot be trusted, but re-applying Pending is a
            // no-op write either way and keeps the attempt open for polling.
            if let Some(token) = payload.get(REFERENCE_FIELD).filter(|t| !t.trim().is_empty()) {
                if let Err(err) = state
                    .engine
                    .apply(token.trim(), PaymentStatus::Pending, SignalSource::Notify)
                    .await
                {
                    warn!(error = %err, "pending fallback not applied");
                }
            }
        }
        Err(VerificationError::MalformedPayload { missing }) => {
            warn!(missing = %missing, "malformed notification payload ignored");
        }
    }

    (StatusCode::OK, "OK")
}

/// Append the payment token to a configured base URL.
fn with_token(base: &str, token: &str) -> String {
    let query: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .finish();
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}
