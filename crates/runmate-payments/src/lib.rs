//! Client for a Stripe-compatible hosted checkout API.
//!
//! [`PaymentProcessor`] is the seam the server injects; [`StripeClient`] is
//! the production implementation.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::StripeClient;
pub use error::PaymentError;
pub use types::{
    to_minor_units, CheckoutLineItem, CheckoutSession, CheckoutSessionRequest, CustomerDetails,
    RetrievedSession,
};

/// External payment processor operations used by the checkout workflow.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a hosted checkout session and returns its id and redirect URL.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetches a previously created session.
    async fn retrieve_session(&self, session_id: &str) -> Result<RetrievedSession, PaymentError>;
}
