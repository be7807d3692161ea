//! Inbound notification verification and status mapping.
//!
//! Server-to-server notifications are untrusted until their signature checks
//! out against the shared integration key. Verified gateway status strings
//! are then translated into the internal [`PaymentStatus`] vocabulary via an
//! injectable table, so new gateway statuses resolve through an explicit
//! unmapped branch instead of silently falling through a string switch.

use crate::encoding::Fields;
use crate::error::VerificationError;
use crate::signature::{SignatureScheme, HASH_FIELD};
use crate::types::PaymentStatus;
use std::collections::HashMap;
use tracing::warn;

/// Payload field carrying the payment token.
pub const REFERENCE_FIELD: &str = "reference";
/// Payload field carrying the gateway status string.
pub const STATUS_FIELD: &str = "status";

/// Gateway status vocabulary → internal status table.
#[derive(Debug, Clone, Default)]
pub struct StatusMap {
    entries: HashMap<String, PaymentStatus>,
}

impl StatusMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The Paynow vocabulary. Anything outside this table resolves to
    /// Pending; notably the gateway's own "Cancelled" is left for the
    /// browser cancel path rather than trusted from a push signal.
    pub fn paynow() -> Self {
        let mut map = Self::new();
        map.insert("Paid", PaymentStatus::Completed);
        map.insert("Delivered", PaymentStatus::Completed);
        map.insert("Awaiting Delivery", PaymentStatus::Pending);
        map
    }

    pub fn insert(&mut self, gateway_status: impl Into<String>, status: PaymentStatus) {
        self.entries.insert(gateway_status.into(), status);
    }

    /// Resolve a gateway status string. Unmapped strings are logged and
    /// default to Pending — fail-closed toward follow-up, never toward
    /// treating an unrecognized claim as paid.
    pub fn resolve(&self, raw: &str) -> PaymentStatus {
        match self.entries.get(raw) {
            Some(status) => *status,
            None => {
                warn!(gateway_status = %raw, "unmapped gateway status, defaulting to pending");
                PaymentStatus::Pending
            }
        }
    }
}

/// A verified, mapped notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub token: String,
    pub status: PaymentStatus,
    pub raw_status: String,
}

/// Verifies webhook/poll payloads and maps their status strings.
pub struct NotificationVerifier {
    scheme: SignatureScheme,
    statuses: StatusMap,
}

impl NotificationVerifier {
    pub fn new(scheme: SignatureScheme, statuses: StatusMap) -> Self {
        Self { scheme, statuses }
    }

    /// Verify a payload's signature and map its status.
    ///
    /// The canonical string is reconstructed over all payload fields except
    /// the signature field, in payload order. A mismatch means the signal
    /// cannot be trusted; the caller's policy is to fall back to Pending,
    /// never to trust an unverified claim of success or failure.
    pub fn verify_and_map(&self, payload: &Fields) -> Result<Notification, VerificationError> {
        let token = payload
            .get(REFERENCE_FIELD)
            .filter(|t| !t.trim().is_empty())
            .ok_or(VerificationError::MalformedPayload {
                missing: REFERENCE_FIELD,
            })?
            .trim()
            .to_string();

        let candidate = payload
            .get(HASH_FIELD)
            .ok_or(VerificationError::MalformedPayload { missing: HASH_FIELD })?;

        if !self.scheme.verify(payload, candidate) {
            return Err(VerificationError::SignatureMismatch);
        }

        let raw_status = payload.get(STATUS_FIELD).unwrap_or_default().to_string();
        let status = self.statuses.resolve(&raw_status);

        Ok(Notification {
            token,
            status,
            raw_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> NotificationVerifier {
        NotificationVerifier::new(SignatureScheme::new("integration-key"), StatusMap::paynow())
    }

    fn signed_payload(reference: &str, status: &str) -> Fields {
        let scheme = SignatureScheme::new("integration-key");
        let mut payload = Fields::new();
        payload.push(REFERENCE_FIELD, reference);
        payload.push("paynowreference", "778899");
        payload.push("amount", "10.00");
        payload.push(STATUS_FIELD, status);
        let hash = scheme.sign(&payload);
        payload.push(HASH_FIELD, hash);
        payload
    }

    #[test]
    fn paid_maps_to_completed() {
        let n = verifier().verify_and_map(&signed_payload("abc123", "Paid")).unwrap();
        assert_eq!(n.token, "abc123");
        assert_eq!(n.status, PaymentStatus::Completed);
        assert_eq!(n.raw_status, "Paid");
    }

    #[test]
    fn delivered_maps_to_completed() {
        let n = verifier()
            .verify_and_map(&signed_payload("abc123", "Delivered"))
            .unwrap();
        assert_eq!(n.status, PaymentStatus::Completed);
    }

    #[test]
    fn awaiting_delivery_maps_to_pending() {
        let n = verifier()
            .verify_and_map(&signed_payload("abc123", "Awaiting Delivery"))
            .unwrap();
        assert_eq!(n.status, PaymentStatus::Pending);
    }

    #[test]
    fn unmapped_status_defaults_to_pending() {
        let n = verifier()
            .verify_and_map(&signed_payload("abc123", "Refunded"))
            .unwrap();
        assert_eq!(n.status, PaymentStatus::Pending);
    }

    #[test]
    fn tampered_field_is_rejected() {
        let payload = signed_payload("abc123", "Paid");
        let tampered: Fields = payload
            .iter()
            .map(|(k, v)| {
                let v = if k == "amount" { "9999.00" } else { v };
                (k.to_string(), v.to_string())
            })
            .collect();
        assert_eq!(
            verifier().verify_and_map(&tampered),
            Err(VerificationError::SignatureMismatch)
        );
    }

    #[test]
    fn missing_hash_is_malformed() {
        let mut payload = Fields::new();
        payload.push(REFERENCE_FIELD, "abc123");
        payload.push(STATUS_FIELD, "Paid");
        assert_eq!(
            verifier().verify_and_map(&payload),
            Err(VerificationError::MalformedPayload { missing: HASH_FIELD })
        );
    }

    #[test]
    fn missing_reference_is_malformed() {
        let mut payload = Fields::new();
        payload.push(STATUS_FIELD, "Paid");
        payload.push(HASH_FIELD, "00");
        assert_eq!(
            verifier().verify_and_map(&payload),
            Err(VerificationError::MalformedPayload {
                missing: REFERENCE_FIELD
            })
        );
    }

    #[test]
    fn custom_status_map_is_honoured() {
        let mut statuses = StatusMap::paynow();
        statuses.insert("Cancelled", PaymentStatus::Cancelled);
        let verifier =
            NotificationVerifier::new(SignatureScheme::new("integration-key"), statuses);
        let n = verifier
            .verify_and_map(&signed_payload("abc123", "Cancelled"))
            .unwrap();
        assert_eq!(n.status, PaymentStatus::Cancelled);
    }
}
