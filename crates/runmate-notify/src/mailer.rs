//! Mail delivery through an HTTP relay.
//!
//! The relay accepts `POST {api_url}` with a JSON body
//! `{from, to, subject, text, attachments: [{filename, content_type, content}]}`
//! where attachment content is base64.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Url};
use runmate_core::Order;
use serde::Serialize;

use crate::message::Mail;
use crate::{Notifier, NotifyError};

const MAIL_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Serialize)]
struct RelayAttachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    attachments: Vec<RelayAttachment<'a>>,
}

pub struct HttpMailer {
    client: Client,
    api_url: Url,
    api_key: Option<String>,
    from: String,
}

impl HttpMailer {
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidUrl`] if `api_url` does not parse, or
    /// [`NotifyError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: &str, api_key: Option<&str>, from: &str) -> Result<Self, NotifyError> {
        let api_url = Url::parse(api_url).map_err(|e| NotifyError::InvalidUrl {
            url: api_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(MAIL_TIMEOUT_SECS))
            .user_agent("runmate/0.1")
            .build()?;

        Ok(Self {
            client,
            api_url,
            api_key: api_key.map(str::to_owned),
            from: from.to_owned(),
        })
    }

    /// Delivers one composed message.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] on network failure or
    /// [`NotifyError::Rejected`] if the relay answers with a non-2xx status.
    pub async fn send(&self, mail: &Mail) -> Result<(), NotifyError> {
        let body = RelayMessage {
            from: &self.from,
            to: [mail.to.as_str()],
            subject: &mail.subject,
            text: &mail.text,
            attachments: mail
                .attachments
                .iter()
                .map(|a| RelayAttachment {
                    filename: &a.filename,
                    content_type: &a.content_type,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let mut request = self.client.post(self.api_url.clone()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        tracing::debug!(to = %mail.to, subject = %mail.subject, "mail accepted by relay");
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_order_status_email(
        &self,
        recipient: &str,
        order: &Order,
    ) -> Result<(), NotifyError> {
        self.send(&Mail::order_status(recipient, order)).await
    }

    async fn send_receipt_email(
        &self,
        recipient: &str,
        order: &Order,
        receipt: &[u8],
    ) -> Result<(), NotifyError> {
        self.send(&Mail::receipt(recipient, order, receipt)).await
    }
}

/// Stand-in used when no relay is configured. Every send fails with
/// [`NotifyError::NotConfigured`], which the dispatch helpers log.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send_order_status_email(&self, _: &str, _: &Order) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }

    async fn send_receipt_email(&self, _: &str, _: &Order, _: &[u8]) -> Result<(), NotifyError> {
        Err(NotifyError::NotConfigured)
    }
}

/// Builds the process-wide notifier: an [`HttpMailer`] when a relay URL is
/// set, otherwise a [`DisabledNotifier`].
///
/// # Errors
///
/// Returns the [`HttpMailer::new`] error for an unusable relay URL.
pub fn notifier_from_parts(
    api_url: Option<&str>,
    api_key: Option<&str>,
    from: &str,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match api_url {
        Some(url) => Ok(Arc::new(HttpMailer::new(url, api_key, from)?)),
        None => {
            tracing::warn!("RUNMATE_MAIL_API_URL not set; customer emails are disabled");
            Ok(Arc::new(DisabledNotifier))
        }
    }
}
