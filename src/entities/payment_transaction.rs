//! Payment transaction entity - A charge handled by the external payment gateway.
//!
//! The row id is the external reference sent to the gateway; webhooks report it back
//! so the approval can be matched to an order or a balance top-up.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the external charge pays for
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentTxKind {
    /// Settles an order placed with a deferred payment method
    #[sea_orm(string_value = "order")]
    Order,
    /// Adds funds to the user's balance
    #[sea_orm(string_value = "topup")]
    Topup,
}

/// Gateway-reported state of the charge
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentTxStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Payment transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User being charged
    pub user_id: i64,
    /// Order settled by this charge, for kind `order`
    pub order_id: Option<i64>,
    pub amount: f64,
    pub kind: PaymentTxKind,
    pub status: PaymentTxStatus,
    /// Gateway payment id, known once a webhook has reported it
    pub external_payment_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
