use std::sync::Arc;

use runmate_core::Order;
use tokio::task::JoinHandle;

use crate::receipt::{Customer, ReceiptRenderer};
use crate::Notifier;

/// Sends the order-status email on a detached task. Failures are logged at
/// `warn` and go no further.
pub fn spawn_order_status_email(
    notifier: Arc<dyn Notifier>,
    recipient: String,
    order: Order,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.send_order_status_email(&recipient, &order).await {
            Ok(()) => tracing::info!(order_id = %order.id, status = %order.status, "order status email sent"),
            Err(e) => tracing::warn!(order_id = %order.id, error = %e, "order status email failed"),
        }
    })
}

/// Renders the receipt and emails it on a detached task. Failures are logged
/// at `warn` and go no further.
pub fn spawn_receipt_email(
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn ReceiptRenderer>,
    customer: Customer,
    order: Order,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let receipt = renderer.render(&order, &customer);
        match notifier
            .send_receipt_email(&customer.email, &order, &receipt)
            .await
        {
            Ok(()) => tracing::info!(order_id = %order.id, "receipt email sent"),
            Err(e) => tracing::warn!(order_id = %order.id, error = %e, "receipt email failed"),
        }
    })
}
