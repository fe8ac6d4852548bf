//! Dining table entity - A physical table customers can be seated at.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Floor status of a table as seen by staff
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[sea_orm(string_value = "free")]
    Free,
    #[sea_orm(string_value = "occupied")]
    Occupied,
    #[sea_orm(string_value = "waiting_order")]
    WaitingOrder,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "bill_requested")]
    BillRequested,
    #[sea_orm(string_value = "paid")]
    Paid,
}

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Number painted on the table (e.g., "12", "B3")
    #[sea_orm(unique)]
    pub table_number: String,
    /// Seats available
    pub capacity: i32,
    /// Current floor status
    pub status: TableStatus,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
