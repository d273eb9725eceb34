pub mod app_config;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod filter;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod tokens;
pub mod users;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, parse_catalog, CatalogFile};
pub use checkout::{CheckoutMetadata, ORDER_DATA_KEY};
pub use config::{load_app_config, load_app_config_from_env};
pub use filter::ProfanityFilter;
pub use orders::{
    order_total, validate_requested_items, Order, OrderItem, OrderStatus, PaymentStatus,
    RequestedItem, ShippingAddress, CHECKOUT_PAYMENT_METHOD, DEFAULT_PAYMENT_METHOD,
};
pub use products::{NewProduct, Product, ProductDetail, ProductPatch, MAX_AMOUNT};
pub use reviews::{validate_review_input, RatingAggregate, Review};
pub use tokens::{Claims, TokenError, TokenKeys};
pub use users::{Principal, User, UserPatch};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid order status: {0}")]
    InvalidOrderStatus(String),
    #[error("invalid payment status: {0}")]
    InvalidPaymentStatus(String),
    #[error("invalid checkout metadata: {0}")]
    Metadata(String),
    #[error("profanity filter: {0}")]
    Filter(String),
}
