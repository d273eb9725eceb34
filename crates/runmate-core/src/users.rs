use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// A stored account. The password credential never leaves the database layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub photo: String,
    pub is_admin: bool,
    pub is_social: bool,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl Principal {
    /// Owners act on their own records; admins act on everyone's.
    #[must_use]
    pub fn can_act_for(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Sparse admin update of an account. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub is_admin: Option<bool>,
}

impl UserPatch {
    /// Trims the name, trims and lowercases the email.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for a blank name or a malformed email.
    pub fn normalize(&mut self) -> Result<(), CoreError> {
        if let Some(name) = &mut self.name {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(CoreError::Validation("name is required".to_string()));
            }
        }
        if let Some(email) = &mut self.email {
            *email = email.trim().to_lowercase();
            validate_email(email)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.is_admin.is_none()
    }
}

fn validate_email(email: &str) -> Result<(), CoreError> {
    let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }) && !email.chars().any(char::is_whitespace);

    if !well_formed {
        return Err(CoreError::Validation(format!("invalid email: {email}")));
    }
    Ok(())
}
