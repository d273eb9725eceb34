//! HTTP client for the hosted checkout REST API.
//!
//! Wraps `reqwest` with bearer authentication, form-encoded session creation
//! and typed response deserialization. Non-2xx responses are surfaced as
//! [`PaymentError::Api`] carrying the processor's own error message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};

use crate::error::PaymentError;
use crate::types::{CheckoutSession, CheckoutSessionRequest, RetrievedSession};
use crate::PaymentProcessor;

const DEFAULT_BASE_URL: &str = "https://api.stripe.com/";

/// Client for a Stripe-compatible checkout API.
///
/// Use [`StripeClient::new`] for production or [`StripeClient::with_base_url`]
/// to point at a mock server in tests.
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: Url,
}

impl StripeClient {
    /// Creates a new client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(secret_key: &str, timeout_secs: u64) -> Result<Self, PaymentError> {
        Self::with_base_url(secret_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`PaymentError::InvalidRequest`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        secret_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("runmate/0.1")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            PaymentError::InvalidRequest(format!("invalid base URL '{base_url}': {e}"))
        })?;

        Ok(Self {
            client,
            secret_key: secret_key.to_owned(),
            base_url,
        })
    }

    /// Creates a hosted checkout session.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Api`] if the processor rejects the request.
    /// - [`PaymentError::Http`] on network failure.
    /// - [`PaymentError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = self.endpoint("v1/checkout/sessions")?;
        tracing::debug!(
            line_items = request.line_items.len(),
            "creating checkout session"
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&request.to_form())
            .send()
            .await?;
        let body = Self::success_body(response).await?;

        serde_json::from_str(&body).map_err(|e| PaymentError::Deserialize {
            context: "create checkout session".to_string(),
            source: e,
        })
    }

    /// Retrieves a checkout session by id.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::SessionNotFound`] on a 404.
    /// - [`PaymentError::Api`] for any other non-2xx status.
    /// - [`PaymentError::Http`] on network failure.
    /// - [`PaymentError::Deserialize`] if the response does not match the
    ///   expected shape.
    pub async fn get_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError> {
        if session_id.is_empty() || session_id.contains('/') {
            return Err(PaymentError::InvalidRequest(format!(
                "invalid session id '{session_id}'"
            )));
        }
        let url = self.endpoint(&format!("v1/checkout/sessions/{session_id}"))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PaymentError::SessionNotFound(session_id.to_string()));
        }
        let body = Self::success_body(response).await?;

        serde_json::from_str(&body).map_err(|e| PaymentError::Deserialize {
            context: format!("retrieve checkout session {session_id}"),
            source: e,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        self.base_url
            .join(path)
            .map_err(|e| PaymentError::InvalidRequest(format!("invalid endpoint '{path}': {e}")))
    }

    /// Returns the body of a 2xx response, or the processor's error message.
    async fn success_body(response: Response) -> Result<String, PaymentError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

        Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.create_session(request).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError> {
        self.get_session(session_id).await
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
