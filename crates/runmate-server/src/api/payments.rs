use axum::{extract::State, http::StatusCode, Extension, Json};
use runmate_core::Principal;
use serde::Deserialize;

use crate::middleware::RequestId;
use crate::workflows::checkout::{self, CheckoutInput, CheckoutSessionCreated, ConfirmedOrder};

use super::{map_workflow_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ConfirmRequest {
    #[serde(default)]
    pub session_id: String,
}

/// POST /api/v1/payments/checkout-session
pub(super) async fn create_checkout_session(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CheckoutInput>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutSessionCreated>>), ApiError> {
    let session = checkout::create_checkout_session(&state, &principal, body)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, session))))
}

/// POST /api/v1/payments/confirm
///
/// Answers 201 when this call created the order and 200 when the session had
/// already been confirmed.
pub(super) async fn confirm_checkout(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ConfirmedOrder>>), ApiError> {
    let confirmed = checkout::confirm_checkout_session(&state, &principal, &body.session_id)
        .await
        .map_err(|e| map_workflow_error(req_id.0.clone(), e))?;
    let status = if confirmed.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::new(req_id.0, confirmed))))
}
