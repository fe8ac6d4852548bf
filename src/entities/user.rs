//! User entity - A customer account holding a spendable balance.
//!
//! The balance is credited by top-ups, incoming transfers and refunds and debited by
//! balance-paid orders and outgoing transfers. It never goes negative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, also used to address balance transfers
    #[sea_orm(unique)]
    pub email: String,
    /// Spendable credit in the venue's currency
    pub balance: f64,
    /// Table the user is currently seated at, if any
    pub table_id: Option<i64>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
