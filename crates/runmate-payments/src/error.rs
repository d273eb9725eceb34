use thiserror::Error;

/// Errors returned by the hosted-checkout client.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The processor has no checkout session with this id.
    #[error("checkout session {0} not found")]
    SessionNotFound(String),

    /// The processor rejected the request.
    #[error("payment processor error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The client was built with an unusable base URL or amount.
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
}
