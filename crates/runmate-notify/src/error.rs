use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// No mail relay is configured; every send fails with this.
    #[error("mail delivery is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-2xx status.
    #[error("mail relay rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid mail relay URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
