//! Gift entity - A product one user gives another, redeemable once at the bar.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption state of a gift
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum GiftStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "redeemed")]
    Redeemed,
}

/// Gift database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gifts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Recipient who may redeem the gift
    pub user_id: i64,
    /// Who gave it
    pub sender_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub description: Option<String>,
    pub status: GiftStatus,
    pub created_at: DateTimeUtc,
    pub redeemed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
