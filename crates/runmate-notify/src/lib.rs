//! Best-effort customer notifications: order status emails and receipts.
//!
//! Nothing here can fail a caller's primary operation. The `spawn_*` helpers
//! run each send on its own task and only log the outcome.

pub mod dispatch;
pub mod error;
pub mod mailer;
pub mod message;
pub mod receipt;

use async_trait::async_trait;
use runmate_core::Order;

pub use dispatch::{spawn_order_status_email, spawn_receipt_email};
pub use error::NotifyError;
pub use mailer::{notifier_from_parts, DisabledNotifier, HttpMailer};
pub use message::{Attachment, Mail};
pub use receipt::{Customer, ReceiptRenderer, TextReceiptRenderer};

/// Outbound customer email.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tells the order's owner that its fulfilment status changed.
    async fn send_order_status_email(&self, recipient: &str, order: &Order)
        -> Result<(), NotifyError>;

    /// Sends a purchase receipt with the rendered document attached.
    async fn send_receipt_email(
        &self,
        recipient: &str,
        order: &Order,
        receipt: &[u8],
    ) -> Result<(), NotifyError>;
}
