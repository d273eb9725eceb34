use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::products::MAX_AMOUNT;
use crate::CoreError;

/// Default payment method recorded for orders placed without the hosted checkout.
pub const DEFAULT_PAYMENT_METHOD: &str = "cash_on_delivery";

/// Payment method recorded for orders reconciled from a checkout session.
pub const CHECKOUT_PAYMENT_METHOD: &str = "stripe";

/// Fulfilment status of an order.
///
/// Transitions follow a forward-only graph; see [`OrderStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if an order in this status may move to `next`.
    ///
    /// pending → processing | cancelled, processing → shipped | cancelled,
    /// shipped → delivered. Delivered and cancelled are terminal. Staying in
    /// the same status is not a transition and returns `false`.
    #[must_use]
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (
                OrderStatus::Pending,
                OrderStatus::Processing | OrderStatus::Cancelled
            ) | (
                OrderStatus::Processing,
                OrderStatus::Shipped | OrderStatus::Cancelled
            ) | (OrderStatus::Shipped, OrderStatus::Delivered)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Orders may only be deleted while pending or cancelled.
    #[must_use]
    pub fn is_deletable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(CoreError::InvalidOrderStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::InvalidPaymentStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Rejects addresses with any blank component.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first blank field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields = [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip_code", &self.zip_code),
            ("country", &self.country),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "shipping address {name} is required"
                )));
            }
        }
        Ok(())
    }
}

/// One `(product, quantity)` pair requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Validates a requested item list before any product lookup happens.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the list is empty or any quantity is
/// below 1.
pub fn validate_requested_items(items: &[RequestedItem]) -> Result<(), CoreError> {
    if items.is_empty() {
        return Err(CoreError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }
    if let Some(bad) = items.iter().find(|i| i.quantity < 1) {
        return Err(CoreError::Validation(format!(
            "quantity for product {} must be at least 1, got {}",
            bad.product_id, bad.quantity
        )));
    }
    Ok(())
}

/// A line of a persisted order, carrying the name and price captured at
/// purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    /// `None` once the referenced product has been deleted.
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub is_reviewed: bool,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub shipping_address: ShippingAddress,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// Sums `unit_price × quantity` over `(unit_price, quantity)` pairs.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the total exceeds [`MAX_AMOUNT`].
pub fn order_total<I>(lines: I) -> Result<Decimal, CoreError>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let mut total = Decimal::ZERO;
    for (price, qty) in lines {
        total = price
            .checked_mul(Decimal::from(qty))
            .and_then(|line| total.checked_add(line))
            .filter(|sum| *sum <= MAX_AMOUNT)
            .ok_or_else(|| {
                CoreError::Validation(format!("order total must not exceed {MAX_AMOUNT}"))
            })?;
    }
    Ok(total)
}
