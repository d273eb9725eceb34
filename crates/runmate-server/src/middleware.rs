use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use runmate_core::{Principal, TokenError, TokenKeys};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Token verification plus the pool used to reload the caller.
#[derive(Clone)]
pub struct AuthState {
    keys: Arc<TokenKeys>,
    pool: PgPool,
}

impl AuthState {
    #[must_use]
    pub fn new(keys: TokenKeys, pool: PgPool) -> Self {
        Self {
            keys: Arc::new(keys),
            pool,
        }
    }
}

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter shared by every authenticated route.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(RateLimitWindow {
                started_at: Instant::now(),
                count: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Verifies the bearer token, reloads the caller from storage and stores
/// them as a [`Principal`] request extension.
///
/// `is_admin` always comes from the stored user, so a promotion or a
/// revocation takes effect on the next request rather than when the token
/// expires. Tokens for deleted users are rejected.
pub async fn require_principal(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        );
    };

    let claimed = match auth.keys.verify(token) {
        Ok(principal) => principal,
        Err(TokenError::Expired) => {
            return reject(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "bearer token has expired",
            )
        }
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            return reject(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "missing or invalid bearer token",
            );
        }
    };

    match runmate_db::get_user(&auth.pool, claimed.user_id).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(Principal {
                user_id: user.id,
                email: user.email,
                is_admin: user.is_admin,
            });
            next.run(req).await
        }
        Ok(None) => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "account no longer exists",
        ),
        Err(e) => {
            tracing::error!(error = %e, user_id = %claimed.user_id, "principal lookup failed");
            reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "database query failed",
            )
        }
    }
}

/// Lets admins through. Must run after [`require_principal`], which has
/// already replaced the token's admin claim with the stored flag.
pub async fn require_admin(req: Request, next: Next) -> Response {
    match req.extensions().get::<Principal>() {
        Some(principal) if principal.is_admin => next.run(req).await,
        Some(_) => reject(StatusCode::FORBIDDEN, "forbidden", "admin access required"),
        None => reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Middleware enforcing a fixed request-per-window limit.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let mut window = rate_limit.state.lock().await;
    let elapsed = window.started_at.elapsed();

    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }

    window.count += 1;
    drop(window);

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
