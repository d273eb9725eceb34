use runmate_core::Order;

pub(crate) const RECEIPT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Who the receipt is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

/// Renders an order into a receipt document.
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, order: &Order, customer: &Customer) -> Vec<u8>;
}

/// Fixed-width plain-text receipt.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReceiptRenderer;

const RECEIPT_WIDTH: usize = 64;

impl ReceiptRenderer for TextReceiptRenderer {
    fn render(&self, order: &Order, customer: &Customer) -> Vec<u8> {
        let rule = "-".repeat(RECEIPT_WIDTH);
        let address = &order.shipping_address;

        let mut lines = vec![
            format!("{:^RECEIPT_WIDTH$}", "RunMate"),
            format!("{:^RECEIPT_WIDTH$}", "Order Receipt"),
            rule.clone(),
            format!("Order ID:   {}", order.id),
            format!(
                "Order Date: {}",
                order.created_at.format("%Y-%m-%d %H:%M UTC")
            ),
            format!("Customer:   {}", customer.name),
            format!("Email:      {}", customer.email),
            String::new(),
            "Shipping Address:".to_string(),
            format!("  {}", address.street),
            format!("  {}, {}", address.city, address.state),
            format!("  {}, {}", address.zip_code, address.country),
            String::new(),
            item_row("Item", "Qty", "Price", "Total"),
            rule.clone(),
        ];
        lines.extend(order.items.iter().map(|item| {
            item_row(
                &truncate(&item.product_name, 31),
                &item.quantity.to_string(),
                &format!("${:.2}", item.unit_price),
                &format!("${:.2}", item.line_total()),
            )
        }));
        lines.extend([
            rule,
            format!(
                "{:>RECEIPT_WIDTH$}",
                format!("Total: ${:.2}", order.total_amount)
            ),
            String::new(),
            format!("Payment Method: {}", order.payment_method),
            format!("Payment Status: {}", order.payment_status),
            String::new(),
            "Thank you for running with RunMate!".to_string(),
        ]);

        let mut out = lines.join("\n");
        out.push('\n');
        out.into_bytes()
    }
}

fn item_row(name: &str, qty: &str, price: &str, total: &str) -> String {
    format!("{name:<32}{qty:>6}{price:>12}{total:>14}")
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
