mod api;
mod middleware;
mod workflows;

use std::sync::Arc;

use runmate_core::{ProfanityFilter, TokenKeys};
use runmate_notify::TextReceiptRenderer;
use runmate_payments::{PaymentProcessor, StripeClient};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::{AuthState, RateLimitState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(runmate_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = runmate_db::PoolConfig::from_app_config(&config);
    let pool = runmate_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = runmate_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations complete");

    let payments: Option<Arc<dyn PaymentProcessor>> = match &config.stripe_secret_key {
        Some(key) => Some(Arc::new(StripeClient::with_base_url(
            key,
            config.payment_timeout_secs,
            &config.stripe_api_base,
        )?)),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set; checkout is unavailable");
            None
        }
    };
    let notifier = runmate_notify::notifier_from_parts(
        config.mail_api_url.as_deref(),
        config.mail_api_key.as_deref(),
        &config.mail_from,
    )?;

    let auth = AuthState::new(TokenKeys::from_secret(&config.jwt_secret), pool.clone());
    let rate_limit = RateLimitState::per_minute(config.rate_limit_per_minute);
    let state = AppState {
        pool,
        config: Arc::clone(&config),
        payments,
        notifier,
        renderer: Arc::new(TextReceiptRenderer),
        filter: Arc::new(ProfanityFilter::new()?),
    };
    let app = build_app(state, auth, rate_limit);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "runmate server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
