//! Poll fallback worker.
//!
//! Server notifications can be lost, so attempts that stay pending past a
//! configured age are polled directly against the gateway. Poll responses go
//! through the same verification and reconciliation path as notifications;
//! a poll that cannot be verified or completed leaves the attempt pending
//! for the next cycle rather than guessing a terminal state.

use crate::config::PollerConfig;
use crate::error::{GatewayError, StoreError};
use crate::gateway::PollTransport;
use crate::notify::NotificationVerifier;
use crate::reconcile::ReconcileEngine;
use crate::store::{PendingAttempt, TransactionStore};
use crate::types::SignalSource;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

pub struct PollWorker {
    config: PollerConfig,
    store: Arc<dyn TransactionStore>,
    client: Arc<dyn PollTransport>,
    verifier: Arc<NotificationVerifier>,
    engine: Arc<ReconcileEngine>,
}

impl PollWorker {
    pub fn new(
        config: PollerConfig,
        store: Arc<dyn TransactionStore>,
        client: Arc<dyn PollTransport>,
        verifier: Arc<NotificationVerifier>,
        engine: Arc<ReconcileEngine>,
    ) -> Self {
        Self {
            config,
            store,
            client,
            verifier,
            engine,
        }
    }

    /// Main worker loop; runs until the shutdown signal flips.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.interval_secs,
            pending_age_secs = self.config.pending_age_secs,
            "poll fallback worker started"
        );

        let mut ticker = interval(self.config.interval());

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("shutdown signal received, stopping poll worker");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.cycle().await {
                        error!(error = %e, "poll cycle failed");
                    }
                }
            }
        }

        info!("poll fallback worker stopped");
    }

    /// One cycle: poll every stale pending attempt. Per-attempt failures are
    /// logged and do not stop the cycle.
    #[instrument(skip(self))]
    async fn cycle(&self) -> Result<(), StoreError> {
        let stale = self.store.stale_pending(self.config.pending_age()).await?;
        if !stale.is_empty() {
            debug!(count = stale.len(), "polling stale pending attempts");
        }
        for attempt in stale {
            self.poll_attempt(&attempt).await;
        }
        Ok(())
    }

    async fn poll_attempt(&self, attempt: &PendingAttempt) {
        let Some(poll_url) = &attempt.poll_url else {
            debug!(token = %attempt.token, "no poll url recorded, skipping");
            return;
        };

        let fields = match self.client.poll(poll_url).await {
            Ok(fields) => fields,
            Err(GatewayError::Unreachable(msg)) => {
                warn!(token = %attempt.token, error = %msg, "gateway unreachable during poll, retrying next cycle");
                return;
            }
            Err(err) => {
                warn!(token = %attempt.token, error = %err, "poll failed");
                return;
            }
        };

        let notification = match self.verifier.verify_and_map(&fields) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(token = %attempt.token, error = %err, "poll response failed verification, attempt stays pending");
                return;
            }
        };

        if notification.token != attempt.token {
            warn!(
                token = %attempt.token,
                reference = %notification.token,
                "poll response reference does not match attempt, ignoring"
            );
            return;
        }

        match self
            .engine
            .apply(&notification.token, notification.status, SignalSource::Poll)
            .await
        {
            Ok(applied) => {
                debug!(
                    token = %notification.token,
                    gateway_status = %notification.raw_status,
                    applied = %applied,
                    "poll result reconciled"
                );
            }
            Err(err) => {
                warn!(token = %notification.token, error = %err, "failed to apply poll result");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Fields;
    use crate::notify::StatusMap;
    use crate::signature::{SignatureScheme, HASH_FIELD};
    use crate::store::MemoryStore;
    use crate::types::{Charge, PaymentStatus};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    const SECRET: &str = "integration-key";

    /// Canned poll transport: one fixed response body, or unreachable.
    struct StubTransport {
        fields: Fields,
        unreachable: bool,
    }

    #[async_trait]
    impl PollTransport for StubTransport {
        async fn poll(&self, poll_url: &str) -> Result<Fields, GatewayError> {
            if poll_url.trim().is_empty() {
                return Err(GatewayError::InvalidPollUrl);
            }
            if self.unreachable {
                return Err(GatewayError::Unreachable("connection refused".to_string()));
            }
            Ok(self.fields.clone())
        }
    }

    fn signed_poll_response(reference: &str, status: &str) -> Fields {
        let mut fields = Fields::new();
        fields.push("reference", reference);
        fields.push("amount", "10.00");
        fields.push("status", status);
        let hash = SignatureScheme::new(SECRET).sign(&fields);
        fields.push(HASH_FIELD, hash);
        fields
    }

    async fn worker_with(
        transport: StubTransport,
    ) -> (PollWorker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_pending(
                "t1",
                Charge {
                    amount: Decimal::new(1000, 2),
                    currency: "USD".to_string(),
                },
            )
            .await;

        let config = PollerConfig {
            enabled: true,
            interval_secs: 1,
            pending_age_secs: 0,
        };
        let engine = Arc::new(ReconcileEngine::new(store.clone()));
        let verifier = Arc::new(NotificationVerifier::new(
            SignatureScheme::new(SECRET),
            StatusMap::paynow(),
        ));
        let worker = PollWorker::new(config, store.clone(), Arc::new(transport), verifier, engine);
        (worker, store)
    }

    #[tokio::test]
    async fn verified_poll_result_settles_the_attempt() {
        let (worker, store) = worker_with(StubTransport {
            fields: signed_poll_response("t1", "Paid"),
            unreachable: false,
        })
        .await;
        store.record_poll_url("t1", "https://pay.example/poll/9").await.unwrap();

        worker.cycle().await.unwrap();
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Completed)
        );
    }

    #[tokio::test]
    async fn attempt_without_poll_url_is_skipped() {
        let (worker, store) = worker_with(StubTransport {
            fields: signed_poll_response("t1", "Paid"),
            unreachable: false,
        })
        .await;

        worker.cycle().await.unwrap();
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn mismatched_reference_is_ignored() {
        // Verifiable response, but for a different attempt's token.
        let (worker, store) = worker_with(StubTransport {
            fields: signed_poll_response("other", "Paid"),
            unreachable: false,
        })
        .await;
        store.record_poll_url("t1", "https://pay.example/poll/9").await.unwrap();

        worker.cycle().await.unwrap();
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn unverifiable_poll_response_keeps_the_attempt_pending() {
        let mut fields = signed_poll_response("t1", "Paid");
        fields.push("extra", "tacked-on-after-signing");
        let (worker, store) = worker_with(StubTransport {
            fields,
            unreachable: false,
        })
        .await;
        store.record_poll_url("t1", "https://pay.example/poll/9").await.unwrap();

        worker.cycle().await.unwrap();
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Pending)
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_leaves_the_attempt_for_the_next_cycle() {
        let (worker, store) = worker_with(StubTransport {
            fields: Fields::new(),
            unreachable: true,
        })
        .await;
        store.record_poll_url("t1", "https://pay.example/poll/9").await.unwrap();

        worker.cycle().await.unwrap();
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Pending)
        );
    }
}
