use runmate_core::{Principal, User, UserPatch};
use runmate_db::{Page, UserFilters};
use sqlx::PgPool;
use uuid::Uuid;

use super::{PageRequest, WorkflowError};

/// Admin account listing, newest first. `search` matches name or email.
pub async fn list_users(
    pool: &PgPool,
    search: Option<&str>,
    page: PageRequest,
) -> Result<Page<User>, WorkflowError> {
    let filters = UserFilters {
        search: search.map(str::trim).filter(|s| !s.is_empty()),
        limit: page.limit,
        offset: page.offset(),
    };
    let page = runmate_db::list_users(pool, &filters).await?;

    Ok(Page {
        items: page.items.into_iter().map(User::from).collect(),
        total: page.total,
    })
}

/// Changes another account's name, email or admin flag. Admins cannot
/// revoke their own flag.
pub async fn update_user(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
    mut patch: UserPatch,
) -> Result<User, WorkflowError> {
    if patch.is_empty() {
        return Err(WorkflowError::ValidationFailed(
            "no fields to update".to_string(),
        ));
    }
    if id == principal.user_id && patch.is_admin == Some(false) {
        return Err(WorkflowError::ValidationFailed(
            "admins cannot revoke their own admin flag".to_string(),
        ));
    }
    patch.normalize()?;

    let row = runmate_db::update_user(pool, id, &patch)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    tracing::info!(
        user_id = %id,
        is_admin = row.is_admin,
        email_changed = patch.email.is_some(),
        changed_by = %principal.user_id,
        "user updated"
    );
    Ok(row.into())
}

/// Removes another account with its orders and reviews.
pub async fn delete_user(
    pool: &PgPool,
    principal: &Principal,
    id: Uuid,
) -> Result<User, WorkflowError> {
    if id == principal.user_id {
        return Err(WorkflowError::ValidationFailed(
            "admins cannot delete their own account".to_string(),
        ));
    }

    let row = runmate_db::delete_user(pool, id)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    tracing::info!(user_id = %id, deleted_by = %principal.user_id, "user deleted");
    Ok(row.into())
}

fn user_not_found(id: Uuid) -> WorkflowError {
    WorkflowError::NotFound(format!("user {id} not found"))
}
