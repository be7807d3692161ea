//! Reconciliation core for Paynow-style payment gateway integrations.
//!
//! Turns an asynchronous, possibly out-of-order set of signals about a
//! payment attempt (browser return, browser cancel, server notification,
//! poll) into one authoritative, idempotent final status per token. The
//! surrounding commerce system supplies the [`store::TransactionStore`]
//! collaborator; everything else lives here.

pub mod api;
pub mod config;
pub mod encoding;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod notify;
pub mod reconcile;
pub mod signature;
pub mod store;
pub mod types;
pub mod workers;

pub use error::{AppError, GatewayError, ReconcileError, StoreError, VerificationError};
pub use notify::{Notification, NotificationVerifier, StatusMap};
pub use reconcile::{ReconcileEngine, ReturnDisposition};
pub use signature::SignatureScheme;
pub use types::{Charge, PaymentStatus, SignalSource};
