//! Table session entity - One sitting at a table, accumulating spend across orders.
//!
//! At most one session per table is `active`. `total_spent` is always overwritten with
//! a full recomputation, never incremented.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether the sitting is still open
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Table session database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "table_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Table this sitting belongs to
    pub table_id: i64,
    /// When the sitting started
    pub started_at: DateTimeUtc,
    /// When the sitting was closed; `None` while active
    pub ended_at: Option<DateTimeUtc>,
    /// Confirmed spend of all orders linked to the table
    pub total_spent: f64,
    pub status: SessionStatus,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
