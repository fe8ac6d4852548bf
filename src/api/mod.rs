//! HTTP interface - JSON routes over the core operations.
//!
//! [`build_router`] is the single entry point. Middleware layers are attached by
//! [`server::serve`] so tests can drive the bare router in-process.

use crate::{
    config::{OrderPolicy, PaymentsConfig},
    core::{events::EventBus, payment::PaymentGateway},
};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Maps core errors to HTTP responses
pub mod error;
/// Health check and server-sent domain events
pub mod events;
/// Extractors that reject malformed input as validation errors
pub mod extract;
/// Transfers, history and payment links
pub mod ledger;
/// Products, gifts and notifications
pub mod menu;
/// Order creation, lookup, cancellation and status
pub mod orders;
/// Top-ups and the gateway webhook
pub mod payments;
/// Listener, middleware and graceful shutdown
pub mod server;
/// Table overview, closing and service requests
pub mod tables;

#[cfg(test)]
mod tests;

/// Shared state handed to every handler
pub struct AppState {
    pub database: DatabaseConnection,
    pub events: EventBus,
    pub policy: OrderPolicy,
    pub payments: PaymentsConfig,
    /// `None` when no gateway credentials are configured
    pub gateway: Option<Arc<dyn PaymentGateway>>,
}

/// Builds the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(events::health))
        .route("/api/events", get(events::stream))
        .route("/api/products", get(menu::list_products))
        .route("/api/products/{id}", get(menu::get_product))
        .route("/api/gifts", get(menu::list_gifts))
        .route("/api/gifts/{id}/redeem", post(menu::redeem_gift))
        .route("/api/notifications", get(menu::list_notifications))
        .route(
            "/api/orders",
            post(orders::create_order).get(orders::list_orders),
        )
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/cancel", post(orders::cancel_order))
        .route("/api/orders/{id}/status", post(orders::advance_status))
        .route(
            "/api/transfers",
            post(ledger::transfer).get(ledger::history),
        )
        .route("/api/payment-links", post(ledger::generate_link))
        .route("/api/payment-links/{token}", get(ledger::link_details))
        .route("/api/payment-links/{token}/redeem", post(ledger::redeem_link))
        .route("/api/topups", post(payments::create_topup))
        .route("/api/payments/webhook", post(payments::webhook))
        .route("/api/tables/{id}", get(tables::table_status))
        .route("/api/tables/{id}/close", post(tables::close_table))
        .route("/api/tables/{id}/requests", post(tables::request_service))
        .with_state(state)
}

/// `?user_id=` query shared by the per-user listings
#[derive(Debug, serde::Deserialize)]
pub struct UserQuery {
    pub user_id: i64,
}
