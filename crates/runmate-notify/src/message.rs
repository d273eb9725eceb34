use runmate_core::Order;

use crate::receipt::RECEIPT_CONTENT_TYPE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A composed email, independent of how it is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl Mail {
    #[must_use]
    pub fn order_status(recipient: &str, order: &Order) -> Self {
        let text = format!(
            "Hi,\n\n\
             Your RunMate order {id} is now {status}.\n\
             Payment status: {payment}\n\
             Total: ${total:.2}\n\n\
             You can view this order anytime by logging in to your RunMate account.\n",
            id = order.id,
            status = order.status,
            payment = order.payment_status,
            total = order.total_amount,
        );
        Self {
            to: recipient.to_string(),
            subject: format!("Your RunMate order {} is {}", order.id, order.status),
            text,
            attachments: vec![],
        }
    }

    #[must_use]
    pub fn receipt(recipient: &str, order: &Order, receipt: &[u8]) -> Self {
        let text = format!(
            "Thank you for your purchase!\n\n\
             Order ID: {id}\n\
             Total Amount: ${total:.2}\n\
             Payment Method: {method}\n\n\
             You can also view this order anytime by logging in to your RunMate account.\n",
            id = order.id,
            total = order.total_amount,
            method = order.payment_method,
        );
        Self {
            to: recipient.to_string(),
            subject: format!("Your RunMate receipt - Order {}", order.id),
            text,
            attachments: vec![Attachment {
                filename: format!("runmate-receipt-{}.txt", order.id),
                content_type: RECEIPT_CONTENT_TYPE.to_string(),
                content: receipt.to_vec(),
            }],
        }
    }
}
