//! HTTP client for the gateway's initiate and poll endpoints.
//!
//! Builds and signs the outbound form body, performs exactly one bounded
//! network call per invocation, and parses the gateway's `key=value&...`
//! response dialect. Never applies a payment status itself; interpretation
//! of poll results belongs to the notification verifier and the
//! reconciliation engine.

use crate::config::GatewayConfig;
use crate::encoding::{self, Fields};
use crate::error::GatewayError;
use crate::signature::{SignatureScheme, HASH_FIELD};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

/// Fixed literal the gateway expects in the initiate request's status field.
const INITIATE_STATUS: &str = "Message";
/// Success sentinel in gateway response bodies.
const OK_STATUS: &str = "Ok";

/// Currencies this gateway flow settles in.
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD"];

/// One initiate call's worth of request data. Built once, signed once, sent
/// once.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub token: String,
    pub amount: Decimal,
    pub return_url: String,
    pub result_url: String,
    pub buyer_email: Option<String>,
}

/// Parsed successful initiate response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateResponse {
    /// Where to redirect the user's browser. Receiving this does not mean
    /// the payment is resolved; it is merely in flight at the gateway.
    pub browser_url: String,
    /// Gateway-supplied URL for the poll fallback.
    pub poll_url: Option<String>,
}

pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
    scheme: SignatureScheme,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let scheme = SignatureScheme::new(config.integration_key.clone());
        Ok(Self {
            http,
            config,
            scheme,
        })
    }

    /// Ordered, signed field set for an initiate request. Field order is
    /// part of the signature, so this is the one place it is defined.
    fn initiate_fields(&self, request: &InitiateRequest) -> Fields {
        let mut fields = Fields::new();
        fields.push("id", &self.config.merchant_id);
        fields.push("reference", &request.token);
        fields.push("amount", format!("{:.2}", request.amount));
        fields.push("returnurl", &request.return_url);
        fields.push("resulturl", &request.result_url);
        fields.push("status", INITIATE_STATUS);
        if let Some(email) = &request.buyer_email {
            fields.push("authemail", email);
        }
        let hash = self.scheme.sign(&fields);
        fields.push(HASH_FIELD, hash);
        fields
    }

    /// Initiate a transaction at the gateway, returning the browser
    /// redirect URL and the poll URL for the fallback path.
    #[instrument(skip(self, request), fields(token = %request.token))]
    pub async fn initiate(
        &self,
        request: &InitiateRequest,
    ) -> Result<InitiateResponse, GatewayError> {
        let fields = self.initiate_fields(request);
        debug!(url = %self.config.initiate_url, "sending initiate request");

        let response = self
            .http
            .post(&self.config.initiate_url)
            .form(fields.pairs())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        interpret_initiate_response(&encoding::parse(&body))
    }

    /// Poll the gateway for the current state of an attempt.
    ///
    /// An empty URL is a caller error and fails before any network call.
    /// The parsed body is returned as-is for the notification verifier.
    #[instrument(skip(self))]
    pub async fn poll(&self, poll_url: &str) -> Result<Fields, GatewayError> {
        if poll_url.trim().is_empty() {
            return Err(GatewayError::InvalidPollUrl);
        }

        let response = self
            .http
            .post(poll_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        Ok(encoding::parse(&body))
    }
}

/// Transport seam for the poll fallback.
///
/// Workers poll through this trait rather than the concrete HTTP client,
/// the same way payment providers sit behind a trait in the rest of the
/// stack.
#[async_trait]
pub trait PollTransport: Send + Sync {
    async fn poll(&self, poll_url: &str) -> Result<Fields, GatewayError>;
}

#[async_trait]
impl PollTransport for GatewayClient {
    async fn poll(&self, poll_url: &str) -> Result<Fields, GatewayError> {
        GatewayClient::poll(self, poll_url).await
    }
}

fn interpret_initiate_response(fields: &Fields) -> Result<InitiateResponse, GatewayError> {
    let status = fields
        .get("status")
        .ok_or_else(|| GatewayError::MalformedResponse("missing status field".to_string()))?;

    if status != OK_STATUS {
        return Err(GatewayError::Rejected {
            status: status.to_string(),
        });
    }

    let browser_url = fields
        .get("browserurl")
        .ok_or_else(|| GatewayError::MalformedResponse("missing browserurl field".to_string()))?;

    Ok(InitiateResponse {
        browser_url: browser_url.to_string(),
        poll_url: fields.get("pollurl").map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_INITIATE_URL;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayConfig {
            merchant_id: "1201".to_string(),
            integration_key: "integration-key".to_string(),
            initiate_url: DEFAULT_INITIATE_URL.to_string(),
            return_url: "https://tickets.example/return".to_string(),
            result_url: "https://tickets.example/notify".to_string(),
            request_timeout_secs: 15,
        })
        .unwrap()
    }

    fn request() -> InitiateRequest {
        InitiateRequest {
            token: "abc123".to_string(),
            amount: Decimal::new(1000, 2),
            return_url: "https://tickets.example/return?token=abc123".to_string(),
            result_url: "https://tickets.example/notify".to_string(),
            buyer_email: None,
        }
    }

    #[test]
    fn initiate_fields_are_ordered_and_signed() {
        let client = client();
        let fields = client.initiate_fields(&request());

        let keys: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec!["id", "reference", "amount", "returnurl", "resulturl", "status", "hash"]
        );
        assert_eq!(fields.get("reference"), Some("abc123"));
        assert_eq!(fields.get("amount"), Some("10.00"));
        assert_eq!(fields.get("status"), Some("Message"));

        let hash = fields.get("hash").unwrap();
        let scheme = SignatureScheme::new("integration-key");
        assert!(scheme.verify(&fields, hash));
    }

    #[test]
    fn buyer_email_goes_before_the_hash() {
        let client = client();
        let mut req = request();
        req.buyer_email = Some("buyer@example.com".to_string());
        let fields = client.initiate_fields(&req);

        let keys: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(&keys[keys.len() - 2..], &["authemail", "hash"]);

        let hash = fields.get("hash").unwrap();
        assert!(SignatureScheme::new("integration-key").verify(&fields, hash));
    }

    #[test]
    fn ok_response_yields_redirect_and_poll_url() {
        let body = "status=Ok&browserurl=https%3A%2F%2Fpay.example%2Fx&pollurl=https%3A%2F%2Fpay.example%2Fpoll%2F9";
        let parsed = interpret_initiate_response(&encoding::parse(body)).unwrap();
        assert_eq!(parsed.browser_url, "https://pay.example/x");
        assert_eq!(parsed.poll_url.as_deref(), Some("https://pay.example/poll/9"));
    }

    #[test]
    fn error_response_is_rejected() {
        let body = "status=Error&error=Invalid+merchant";
        let err = interpret_initiate_response(&encoding::parse(body)).unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status } if status == "Error"));
    }

    #[test]
    fn ok_without_browserurl_is_malformed() {
        let err = interpret_initiate_response(&encoding::parse("status=Ok")).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_poll_url_fails_without_network_call() {
        let err = client().poll("  ").await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPollUrl));
    }
}
