//! User administration commands.

use anyhow::{bail, Context};
use runmate_core::{Principal, TokenKeys};
use sqlx::PgPool;

/// Longest lifetime `token` will mint.
const MAX_TTL_HOURS: i64 = 24 * 30;

pub(crate) async fn run_set_admin(pool: &PgPool, email: &str, is_admin: bool) -> anyhow::Result<()> {
    let user = runmate_db::get_user_by_email(pool, email)
        .await?
        .with_context(|| format!("no user with email {email}"))?;

    if user.is_admin == is_admin {
        println!("{} already has is_admin = {is_admin}", user.email);
        return Ok(());
    }

    runmate_db::set_user_admin(pool, user.id, is_admin)
        .await?
        .with_context(|| format!("user {} disappeared during update", user.id))?;
    tracing::info!(user_id = %user.id, is_admin, "admin flag updated from cli");
    println!("{}: is_admin = {is_admin}", user.email);
    Ok(())
}

pub(crate) async fn run_issue_token(
    pool: &PgPool,
    secret: &str,
    email: &str,
    ttl_hours: i64,
) -> anyhow::Result<String> {
    let ttl = token_ttl(ttl_hours)?;
    let user = runmate_db::get_user_by_email(pool, email)
        .await?
        .with_context(|| format!("no user with email {email}"))?;

    let principal = Principal {
        user_id: user.id,
        email: user.email,
        is_admin: user.is_admin,
    };
    let token = TokenKeys::from_secret(secret).issue(&principal, ttl)?;
    Ok(token)
}

fn token_ttl(hours: i64) -> anyhow::Result<chrono::Duration> {
    if !(1..=MAX_TTL_HOURS).contains(&hours) {
        bail!("--ttl-hours must be between 1 and {MAX_TTL_HOURS}, got {hours}");
    }
    Ok(chrono::Duration::hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_within_bounds_is_accepted() {
        assert_eq!(token_ttl(1).unwrap(), chrono::Duration::hours(1));
        assert_eq!(
            token_ttl(MAX_TTL_HOURS).unwrap(),
            chrono::Duration::hours(MAX_TTL_HOURS)
        );
    }

    #[test]
    fn ttl_outside_bounds_is_rejected() {
        assert!(token_ttl(0).is_err());
        assert!(token_ttl(-5).is_err());
        assert!(token_ttl(MAX_TTL_HOURS + 1).is_err());
    }
}
