//! Business operations behind the HTTP handlers.
//!
//! Each workflow takes the authenticated [`Principal`], enforces ownership,
//! runs the storage operation and fires any best-effort side effects after
//! the transaction has committed.

pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod reviews;
pub mod users;

use runmate_core::{CoreError, Principal};
use runmate_db::DbError;
use runmate_payments::PaymentError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    ValidationFailed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{message}")]
    InsufficientStock { product_id: Uuid, message: String },
    #[error("{0}")]
    AlreadyReviewed(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("{0}")]
    Conflict(String),
    #[error("payment processor is not configured")]
    ProcessorUnavailable,
    #[error("{0}")]
    PaymentIncomplete(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Error code carried in the API error envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::AlreadyReviewed(_) => "already_reviewed",
            Self::InvalidState(_) => "invalid_state",
            Self::Conflict(_) => "conflict",
            Self::ProcessorUnavailable => "processor_unavailable",
            Self::PaymentIncomplete(_) => "payment_incomplete",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<DbError> for WorkflowError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound { .. } => Self::NotFound(error.to_string()),
            DbError::InsufficientStock { product_id, .. } => Self::InsufficientStock {
                product_id,
                message: error.to_string(),
            },
            DbError::InvalidOrderTransition { .. } | DbError::OrderNotDeletable { .. } => {
                Self::InvalidState(error.to_string())
            }
            DbError::AlreadyReviewed { .. } => Self::AlreadyReviewed(error.to_string()),
            DbError::EmailTaken { .. } | DbError::UserNotDeletable { .. } => {
                Self::Conflict(error.to_string())
            }
            DbError::InvalidValue(inner) => Self::from(inner),
            DbError::MissingDatabaseUrl | DbError::Sqlx(_) | DbError::Migration(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<CoreError> for WorkflowError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(message) => Self::ValidationFailed(message),
            other => Self::ValidationFailed(other.to_string()),
        }
    }
}

impl From<PaymentError> for WorkflowError {
    fn from(error: PaymentError) -> Self {
        match error {
            PaymentError::SessionNotFound(id) => {
                Self::NotFound(format!("checkout session {id} not found"))
            }
            PaymentError::InvalidRequest(message) => Self::ValidationFailed(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Owners act on their own records, admins on everyone's.
pub(crate) fn authorize(principal: &Principal, owner_id: Uuid, action: &str) -> Result<(), WorkflowError> {
    if principal.can_act_for(owner_id) {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!("not allowed to {action}")))
    }
}

/// 1-based page number plus page size, turned into an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    #[must_use]
    pub fn offset(self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    #[must_use]
    pub fn pages(self, total: i64) -> i64 {
        if total <= 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}
