//! Order entity - A purchase composed of line items with a lifecycle status.
//!
//! `total_amount` is fixed at creation. Status only moves forward
//! (`paying` → `pending` → `preparing` → `ready` → `delivered`) or ends in `cancelled`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored lifecycle status of an order
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Paid (or confirmed) and waiting for the bar to start it
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Waiting for a deferred payment to be confirmed
    #[sea_orm(string_value = "paying")]
    Paying,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// How the order is paid
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Debited from the user's stored balance at creation
    #[sea_orm(string_value = "balance")]
    Balance,
    /// Paid through the external gateway, confirmed by webhook
    #[sea_orm(string_value = "mercadopago")]
    Mercadopago,
    /// Paid at the table
    #[sea_orm(string_value = "cash")]
    Cash,
}

impl PaymentMethod {
    /// Initial stored status for a new order paid this way.
    #[must_use]
    pub const fn initial_status(self) -> OrderStatus {
        match self {
            Self::Balance => OrderStatus::Pending,
            Self::Mercadopago | Self::Cash => OrderStatus::Paying,
        }
    }

    /// Whether payment is already settled when the order is placed.
    #[must_use]
    pub const fn is_confirmed_at_creation(self) -> bool {
        matches!(self, Self::Balance | Self::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who placed the order
    pub user_id: i64,
    /// Sum of unit price × quantity over the items, fixed at creation
    pub total_amount: f64,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// How the order is paid
    pub payment_method: PaymentMethod,
    /// Free-form notes for the bar
    pub notes: Option<String>,
    /// Table the order was placed from, if the user was seated
    pub table_id: Option<i64>,
    /// When the order was created; the cancellation window starts here
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
