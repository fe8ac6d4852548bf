//! Unified error type for `Barflow`.
//!
//! Every core operation returns [`Result`]. Business-rule failures carry enough
//! context to build a human-readable message, and [`Error::kind`] exposes a stable
//! identifier the HTTP layer hands to clients.

use thiserror::Error;

/// All failures surfaced by the ordering, ledger and table-session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or inconsistent input
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong with the input
        message: String,
    },

    /// A balance debit would overdraw the account
    #[error("Insufficient balance: current {current:.2}, required {required:.2}")]
    InsufficientBalance {
        /// Balance at the time of the attempt
        current: f64,
        /// Amount the operation needed
        required: f64,
    },

    /// The order is past the point where it may be cancelled
    #[error("Order {order_id} cannot be cancelled while it is {status}")]
    NotCancellable {
        /// Order identifier
        order_id: i64,
        /// Stored status at the time of the attempt
        status: String,
    },

    /// The cancellation window measured from creation has elapsed
    #[error(
        "Order {order_id} cannot be cancelled after {window_secs} seconds ({elapsed_secs}s elapsed)"
    )]
    CancellationWindowExpired {
        /// Order identifier
        order_id: i64,
        /// Seconds since the order was created
        elapsed_secs: i64,
        /// Configured window length
        window_secs: i64,
    },

    /// The payment link does not exist or was already consumed
    #[error("Invalid or expired payment link")]
    InvalidOrExpiredLink,

    /// No user matches the given identifier
    #[error("User not found: {identifier}")]
    UserNotFound {
        /// Id or email that was looked up
        identifier: String,
    },

    /// Sender and recipient are the same account
    #[error("Invalid recipient: cannot transfer balance to yourself")]
    InvalidRecipient,

    /// Product does not exist or is no longer on the menu
    #[error("Product not found: {id}")]
    ProductNotFound {
        /// Product identifier
        id: i64,
    },

    /// Order does not exist
    #[error("Order not found: {id}")]
    OrderNotFound {
        /// Order identifier
        id: i64,
    },

    /// Dining table does not exist
    #[error("Table not found: {id}")]
    TableNotFound {
        /// Table identifier
        id: i64,
    },

    /// Gift does not exist
    #[error("Gift not found: {id}")]
    GiftNotFound {
        /// Gift identifier
        id: i64,
    },

    /// A forward-only status change was requested out of order
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current stored status
        from: String,
        /// Requested status
        to: String,
    },

    /// The payment gateway was unreachable or answered unexpectedly
    #[error("External service error: {message}")]
    ExternalService {
        /// Description of the gateway failure
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Stable, machine-readable identifier of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::NotCancellable { .. } => "not_cancellable",
            Self::CancellationWindowExpired { .. } => "cancellation_window_expired",
            Self::InvalidOrExpiredLink => "invalid_or_expired_link",
            Self::UserNotFound { .. } => "user_not_found",
            Self::InvalidRecipient => "invalid_recipient",
            Self::ProductNotFound { .. } => "product_not_found",
            Self::OrderNotFound { .. } => "order_not_found",
            Self::TableNotFound { .. } => "table_not_found",
            Self::GiftNotFound { .. } => "gift_not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::ExternalService { .. } => "external_service_error",
            Self::Config { .. } => "config_error",
            Self::Database(_) | Self::Io(_) | Self::EnvVar(_) => "storage_error",
        }
    }

    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::ExternalService {
            message: value.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
