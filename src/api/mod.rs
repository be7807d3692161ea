//! HTTP surface for the reconciliation core.
//!
//! Four endpoints, one per payment signal path. Everything here is a thin
//! adapter: parsing, dependency wiring and HTTP mapping live in this module,
//! while every status decision is made by the reconciliation engine.

pub mod payment;

use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::gateway::GatewayClient;
use crate::notify::NotificationVerifier;
use crate::reconcile::ReconcileEngine;
use crate::store::TransactionStore;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler dependencies.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconcileEngine>,
    pub client: Arc<GatewayClient>,
    pub verifier: Arc<NotificationVerifier>,
    pub store: Arc<dyn TransactionStore>,
    pub gateway: GatewayConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payments/checkout", post(payment::checkout))
        .route("/payments/return", get(payment::payment_return))
        .route("/payments/cancel", get(payment::payment_cancel))
        .route("/payments/notify", post(payment::payment_notify))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
