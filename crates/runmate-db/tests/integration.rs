//! Offline unit tests for runmate-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use rust_decimal::Decimal;
use runmate_core::{AppConfig, Environment, OrderStatus, Product, User};
use runmate_db::{DbError, PoolConfig, ProductRow, UserRow};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000),
        log_level: "info".to_string(),
        jwt_secret: "secret".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        stripe_secret_key: None,
        stripe_api_base: "https://api.stripe.com".to_string(),
        payment_timeout_secs: 30,
        frontend_url: "http://localhost:5173".to_string(),
        checkout_currency: "usd".to_string(),
        mail_api_url: None,
        mail_api_key: None,
        mail_from: "RunMate <no-reply@runmate.com>".to_string(),
        rate_limit_per_minute: 120,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_converts_to_domain_product() {
    let now = Utc::now();
    let row = ProductRow {
        id: Uuid::new_v4(),
        name: "Tempo Trainer".to_string(),
        description: "Daily trainer".to_string(),
        category: "Shoes".to_string(),
        price: Decimal::new(12999, 2),
        stock: 4,
        photos: vec!["https://cdn.runmate.test/tempo.jpg".to_string()],
        rating: Decimal::new(450, 2),
        num_reviews: 2,
        created_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };

    let product: Product = row.clone().into();
    assert_eq!(product.id, row.id);
    assert_eq!(product.stock, 4);
    assert_eq!(product.rating.to_string(), "4.5");
    assert_eq!(product.photos.len(), 1);
}

#[test]
fn user_row_converts_to_domain_user() {
    let row = UserRow {
        id: Uuid::new_v4(),
        email: "pacer@runmate.test".to_string(),
        name: "Pacer".to_string(),
        photo: String::new(),
        is_admin: true,
        is_social: false,
        created_at: Utc::now(),
    };

    let user: User = row.into();
    assert!(user.is_admin);
    assert_eq!(user.email, "pacer@runmate.test");
}

#[test]
fn invalid_transition_error_names_both_statuses() {
    let err = DbError::InvalidOrderTransition {
        id: Uuid::nil(),
        from: OrderStatus::Delivered,
        to: OrderStatus::Pending,
    };
    let message = err.to_string();
    assert!(message.contains("delivered"));
    assert!(message.contains("pending"));
}
