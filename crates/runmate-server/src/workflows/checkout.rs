//! Hosted checkout: create a processor session, then turn a paid session into
//! exactly one order.

use std::sync::Arc;

use runmate_core::{
    CheckoutMetadata, Order, OrderStatus, PaymentStatus, Principal, RequestedItem,
    ShippingAddress, CHECKOUT_PAYMENT_METHOD,
};
use runmate_db::NewOrder;
use runmate_notify::Customer;
use runmate_payments::{to_minor_units, CheckoutLineItem, CheckoutSessionRequest, PaymentProcessor};
use serde::{Deserialize, Serialize};

use crate::api::AppState;

use super::orders::require_shipping_address;
use super::WorkflowError;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutInput {
    #[serde(default)]
    pub items: Vec<RequestedItem>,
    pub shipping_address: Option<ShippingAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSessionCreated {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmedOrder {
    #[serde(flatten)]
    pub order: Order,
    /// `false` when the session had already been confirmed.
    pub created: bool,
}

fn processor(state: &AppState) -> Result<Arc<dyn PaymentProcessor>, WorkflowError> {
    state
        .payments
        .clone()
        .ok_or(WorkflowError::ProcessorUnavailable)
}

/// Checks the cart against the catalog without reserving stock and opens a
/// hosted checkout session carrying everything needed to build the order.
pub async fn create_checkout_session(
    state: &AppState,
    principal: &Principal,
    input: CheckoutInput,
) -> Result<CheckoutSessionCreated, WorkflowError> {
    let processor = processor(state)?;
    let shipping_address = require_shipping_address(input.shipping_address)?;
    let lines = runmate_db::check_availability(&state.pool, &input.items).await?;

    let line_items = lines
        .iter()
        .map(|line| {
            let unit_amount = to_minor_units(line.unit_price).ok_or_else(|| {
                WorkflowError::ValidationFailed(format!(
                    "price of {} cannot be charged",
                    line.product_name
                ))
            })?;
            Ok(CheckoutLineItem {
                name: line.product_name.clone(),
                unit_amount,
                quantity: line.quantity,
            })
        })
        .collect::<Result<Vec<_>, WorkflowError>>()?;

    let metadata = CheckoutMetadata {
        user_id: principal.user_id,
        items: input.items,
        shipping_address,
    }
    .to_metadata()?;

    let request = CheckoutSessionRequest {
        line_items,
        currency: state.config.checkout_currency.clone(),
        success_url: state.config.checkout_success_url(),
        cancel_url: state.config.checkout_cancel_url(),
        customer_email: Some(principal.email.clone()),
        metadata,
    };
    let session = processor.create_checkout_session(&request).await?;

    tracing::info!(session_id = %session.id, user_id = %principal.user_id, "checkout session created");
    Ok(CheckoutSessionCreated {
        session_id: session.id,
        url: session.url,
    })
}

/// Reconciles a paid session into an order. Confirming the same session again
/// returns the order created the first time.
pub async fn confirm_checkout_session(
    state: &AppState,
    principal: &Principal,
    session_id: &str,
) -> Result<ConfirmedOrder, WorkflowError> {
    let processor = processor(state)?;
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(WorkflowError::ValidationFailed(
            "session_id is required".to_string(),
        ));
    }

    let session = processor.retrieve_session(session_id).await?;
    if !session.is_paid() {
        return Err(WorkflowError::PaymentIncomplete(format!(
            "payment for session {session_id} is {}",
            session.payment_status
        )));
    }

    let metadata = CheckoutMetadata::from_metadata(&session.metadata)?;
    if metadata.user_id != principal.user_id && !principal.is_admin {
        return Err(WorkflowError::Forbidden(
            "checkout session belongs to another user".to_string(),
        ));
    }

    let result = runmate_db::create_order_from_session(
        &state.pool,
        session_id,
        &NewOrder {
            user_id: metadata.user_id,
            items: &metadata.items,
            shipping_address: &metadata.shipping_address,
            payment_method: CHECKOUT_PAYMENT_METHOD,
            status: OrderStatus::Processing,
            payment_status: PaymentStatus::Paid,
            payment_session_id: Some(session_id),
        },
    )
    .await?;

    if result.created {
        tracing::info!(
            order_id = %result.order.id,
            session_id,
            total = %result.order.total_amount,
            "order created from checkout session"
        );
        let email = session.email().unwrap_or(&principal.email).to_string();
        let customer = Customer {
            name: session.customer_name().unwrap_or(&email).to_string(),
            email,
        };
        runmate_notify::spawn_receipt_email(
            Arc::clone(&state.notifier),
            Arc::clone(&state.renderer),
            customer,
            result.order.clone(),
        );
    } else {
        tracing::debug!(order_id = %result.order.id, session_id, "checkout session already confirmed");
    }

    Ok(ConfirmedOrder {
        order: result.order,
        created: result.created,
    })
}
