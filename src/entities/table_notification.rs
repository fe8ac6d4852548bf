//! Table notification entity - A request from a table that staff must attend to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the table is asking for
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TableNotificationKind {
    #[sea_orm(string_value = "waiter_call")]
    WaiterCall,
    #[sea_orm(string_value = "bill_request")]
    BillRequest,
    #[sea_orm(string_value = "special_request")]
    SpecialRequest,
    #[sea_orm(string_value = "new_order")]
    NewOrder,
}

/// Table notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "table_notifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub table_id: i64,
    pub kind: TableNotificationKind,
    /// Set once staff has handled the request
    pub resolved_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
