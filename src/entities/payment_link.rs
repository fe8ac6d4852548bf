//! Payment link entity - A single-use token that moves balance to whoever redeems it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Consumption state of a payment link
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Payment link database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Random token embedded in the shared URL
    #[sea_orm(unique)]
    pub token: String,
    /// Amount moved on redemption
    pub amount: f64,
    /// User whose balance funds the link
    pub from_user: i64,
    pub note: Option<String>,
    pub status: LinkStatus,
    pub created_at: DateTimeUtc,
    /// When the link was redeemed
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
