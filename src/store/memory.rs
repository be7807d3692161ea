//! In-memory transaction store.
//!
//! Built-in [`TransactionStore`] adapter backed by a `tokio` RwLock. The
//! compare-and-set in `apply_final_status` holds the write lock across the
//! read-check-write, which is what makes concurrent terminal writers safe.
//! Production deployments implement the trait against their own storage.

use super::{ApplyOutcome, PendingAttempt, TransactionStore};
use crate::error::StoreError;
use crate::types::{Charge, PaymentStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct TransactionRecord {
    status: PaymentStatus,
    charge: Charge,
    poll_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, TransactionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pending attempt. Records are normally created by the commerce
    /// collaborator before checkout reaches the gateway.
    pub async fn insert_pending(&self, token: impl Into<String>, charge: Charge) {
        let now = Utc::now();
        self.records.write().await.insert(
            token.into(),
            TransactionRecord {
                status: PaymentStatus::Pending,
                charge,
                poll_url: None,
                created_at: now,
                updated_at: now,
            },
        );
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn lookup_pending_charge(&self, token: &str) -> Result<Option<Charge>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .get(token)
            .filter(|r| r.status == PaymentStatus::Pending)
            .map(|r| r.charge.clone()))
    }

    async fn status(&self, token: &str) -> Result<Option<PaymentStatus>, StoreError> {
        Ok(self.records.read().await.get(token).map(|r| r.status))
    }

    async fn apply_final_status(
        &self,
        token: &str,
        status: PaymentStatus,
    ) -> Result<ApplyOutcome, StoreError> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(token) else {
            return Ok(ApplyOutcome::UnknownToken);
        };
        if record.status.is_terminal() {
            return Ok(ApplyOutcome::AlreadyTerminal(record.status));
        }
        record.status = status;
        record.updated_at = Utc::now();
        Ok(ApplyOutcome::Applied)
    }

    async fn record_poll_url(&self, token: &str, poll_url: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(token) {
            record.poll_url = Some(poll_url.to_string());
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn stale_pending(
        &self,
        older_than: Duration,
    ) -> Result<Vec<PendingAttempt>, StoreError> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(older_than)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|(_, r)| r.status == PaymentStatus::Pending && r.created_at < cutoff)
            .map(|(token, r)| PendingAttempt {
                token: token.clone(),
                poll_url: r.poll_url.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn usd(amount: i64, scale: u32) -> Charge {
        Charge {
            amount: Decimal::new(amount, scale),
            currency: "USD".to_string(),
        }
    }

    #[tokio::test]
    async fn pending_charge_hidden_once_terminal() {
        let store = MemoryStore::new();
        store.insert_pending("t1", usd(1000, 2)).await;
        assert!(store.lookup_pending_charge("t1").await.unwrap().is_some());

        store
            .apply_final_status("t1", PaymentStatus::Completed)
            .await
            .unwrap();
        assert!(store.lookup_pending_charge("t1").await.unwrap().is_none());
        assert_eq!(
            store.status("t1").await.unwrap(),
            Some(PaymentStatus::Completed)
        );
    }

    #[tokio::test]
    async fn cas_rejects_second_terminal_write() {
        let store = MemoryStore::new();
        store.insert_pending("t1", usd(1000, 2)).await;

        let first = store
            .apply_final_status("t1", PaymentStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(first, ApplyOutcome::Applied);

        let second = store
            .apply_final_status("t1", PaymentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(
            second,
            ApplyOutcome::AlreadyTerminal(PaymentStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn unknown_token_never_creates_a_record() {
        let store = MemoryStore::new();
        let outcome = store
            .apply_final_status("ghost", PaymentStatus::Completed)
            .await
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::UnknownToken);
        assert_eq!(store.status("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn stale_pending_skips_fresh_and_terminal() {
        let store = MemoryStore::new();
        store.insert_pending("fresh", usd(500, 2)).await;
        store.insert_pending("done", usd(500, 2)).await;
        store
            .apply_final_status("done", PaymentStatus::Completed)
            .await
            .unwrap();

        let stale = store.stale_pending(Duration::from_secs(60)).await.unwrap();
        assert!(stale.is_empty());

        // Zero age makes every pending attempt stale.
        let stale = store.stale_pending(Duration::ZERO).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].token, "fresh");
    }
}
