//! Shared test utilities for `Barflow`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    config::ProductSeed,
    core::{
        payment::{GatewayPayment, PaymentGateway},
        product, table, user,
    },
    entities::{self, OrderStatus, PaymentMethod, PaymentTxKind, PaymentTxStatus},
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with the given opening balance.
///
/// # Defaults
/// * email: `<lowercased name>@bar.test`
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    balance: f64,
) -> Result<entities::user::Model> {
    let email = format!("{}@bar.test", name.to_lowercase());
    user::create_user(db, name, &email, balance).await
}

/// Creates an active test product.
///
/// # Defaults
/// * category: "drinks"
/// * description: None
pub async fn create_test_product(
    db: &DatabaseConnection,
    name: &str,
    sale_price: f64,
    stock: i32,
) -> Result<entities::product::Model> {
    let seed = ProductSeed {
        name: name.to_string(),
        category: "drinks".to_string(),
        description: None,
        sale_price,
        stock,
    };
    product::create_product(db, &seed).await
}

/// Creates a free four-seat test table.
pub async fn create_test_table(
    db: &DatabaseConnection,
    table_number: &str,
) -> Result<entities::dining_table::Model> {
    table::create_table(db, table_number, 4).await
}

/// Inserts an order row directly, bypassing the ordering rules.
///
/// The status is the initial status for the payment method. No items, debit, table
/// link or session update are written.
pub async fn insert_test_order(
    db: &DatabaseConnection,
    user_id: i64,
    table_id: Option<i64>,
    total_amount: f64,
    payment_method: PaymentMethod,
) -> Result<entities::order::Model> {
    let now = Utc::now();
    entities::order::ActiveModel {
        user_id: Set(user_id),
        total_amount: Set(total_amount),
        status: Set(payment_method.initial_status()),
        payment_method: Set(payment_method),
        notes: Set(None),
        table_id: Set(table_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a pending order payment transaction.
pub async fn insert_test_payment(
    db: &DatabaseConnection,
    user_id: i64,
    order_id: Option<i64>,
    amount: f64,
) -> Result<entities::payment_transaction::Model> {
    let now = Utc::now();
    entities::payment_transaction::ActiveModel {
        user_id: Set(user_id),
        order_id: Set(order_id),
        amount: Set(amount),
        kind: Set(PaymentTxKind::Order),
        status: Set(PaymentTxStatus::Pending),
        external_payment_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Moves an order to `status` directly, bypassing transition rules.
pub async fn force_order_status(
    db: &DatabaseConnection,
    order: entities::order::Model,
    status: OrderStatus,
) -> Result<entities::order::Model> {
    let mut active: entities::order::ActiveModel = order.into();
    active.status = Set(status);
    active.update(db).await.map_err(Into::into)
}

/// In-memory stand-in for the payment gateway.
///
/// Unknown payment ids fail the way an unreachable gateway would.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    payments: Arc<Mutex<HashMap<String, GatewayPayment>>>,
}

impl FakeGateway {
    /// Registers a payment whose external reference is `transaction_id`.
    #[must_use]
    pub fn with_payment(self, payment_id: &str, status: &str, transaction_id: i64) -> Self {
        self.register(payment_id, status, transaction_id);
        self
    }

    /// Registers a payment on a gateway that may already be shared with an app state.
    pub fn register(&self, payment_id: &str, status: &str, transaction_id: i64) {
        self.payments.lock().unwrap().insert(
            payment_id.to_string(),
            GatewayPayment {
                id: payment_id.to_string(),
                status: status.to_string(),
                external_reference: Some(transaction_id.to_string()),
            },
        );
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| Error::ExternalService {
                message: format!("unknown payment {payment_id}"),
            })
    }
}
