use runmate_core::{
    Order, OrderStatus, PaymentStatus, Principal, RequestedItem, ShippingAddress,
    DEFAULT_PAYMENT_METHOD,
};
use runmate_db::{NewOrder, OrderListFilters, Page, StatusUpdate};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;

use super::{authorize, PageRequest, WorkflowError};

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderInput {
    #[serde(default)]
    pub items: Vec<RequestedItem>,
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<String>,
}

/// Places a direct (unpaid) order for the caller.
pub async fn place_order(
    state: &AppState,
    principal: &Principal,
    input: PlaceOrderInput,
) -> Result<Order, WorkflowError> {
    let shipping_address = require_shipping_address(input.shipping_address)?;
    let payment_method = input
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_METHOD);

    let order = runmate_db::place_order(
        &state.pool,
        &NewOrder {
            user_id: principal.user_id,
            items: &input.items,
            shipping_address: &shipping_address,
            payment_method,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_session_id: None,
        },
    )
    .await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %principal.user_id,
        total = %order.total_amount,
        "order placed"
    );
    Ok(order)
}

/// Admins see every order; everyone else sees their own.
pub async fn list_orders(
    state: &AppState,
    principal: &Principal,
    status: Option<OrderStatus>,
    page: PageRequest,
) -> Result<Page<Order>, WorkflowError> {
    let filters = OrderListFilters {
        user_id: (!principal.is_admin).then_some(principal.user_id),
        status,
        limit: page.limit,
        offset: page.offset(),
    };
    Ok(runmate_db::list_orders(&state.pool, &filters).await?)
}

pub async fn get_order(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<Order, WorkflowError> {
    let order = find_order(state, id).await?;
    authorize(principal, order.user_id, "view this order")?;
    Ok(order)
}

/// Moves an order along the status graph and/or sets its payment status.
/// A real status change emails the owner once the update has committed.
pub async fn update_order_status(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
    update: StatusUpdate,
) -> Result<Order, WorkflowError> {
    if update.status.is_none() && update.payment_status.is_none() {
        return Err(WorkflowError::ValidationFailed(
            "status or payment_status is required".to_string(),
        ));
    }

    let order = find_order(state, id).await?;
    authorize(principal, order.user_id, "update this order")?;

    let outcome = runmate_db::update_order_status(&state.pool, id, update).await?;
    if outcome.status_changed {
        tracing::info!(
            order_id = %id,
            from = %outcome.previous_status,
            to = %outcome.order.status,
            "order status changed"
        );
        notify_owner(state, &outcome.order).await;
    }

    Ok(outcome.order)
}

/// Deletes a pending or cancelled order and returns it as it was.
pub async fn delete_order(
    state: &AppState,
    principal: &Principal,
    id: Uuid,
) -> Result<Order, WorkflowError> {
    let order = find_order(state, id).await?;
    authorize(principal, order.user_id, "delete this order")?;

    let deleted = runmate_db::delete_order(&state.pool, id).await?;
    tracing::info!(order_id = %id, status = %deleted.status, "order deleted");
    Ok(deleted)
}

pub(super) fn require_shipping_address(
    address: Option<ShippingAddress>,
) -> Result<ShippingAddress, WorkflowError> {
    let address = address.ok_or_else(|| {
        WorkflowError::ValidationFailed("shipping address is required".to_string())
    })?;
    address.validate()?;
    Ok(address)
}

async fn find_order(state: &AppState, id: Uuid) -> Result<Order, WorkflowError> {
    runmate_db::get_order(&state.pool, id)
        .await?
        .ok_or_else(|| WorkflowError::NotFound(format!("order {id} not found")))
}

async fn notify_owner(state: &AppState, order: &Order) {
    match runmate_db::get_user(&state.pool, order.user_id).await {
        Ok(Some(owner)) => {
            runmate_notify::spawn_order_status_email(
                state.notifier.clone(),
                owner.email,
                order.clone(),
            );
        }
        Ok(None) => {
            tracing::warn!(order_id = %order.id, user_id = %order.user_id, "order owner not found; skipping status email");
        }
        Err(e) => {
            tracing::warn!(order_id = %order.id, error = %e, "owner lookup failed; skipping status email");
        }
    }
}
