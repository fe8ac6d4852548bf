//! Balance transfer entity - Record of a completed user-to-user balance movement.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Balance transfer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "balance_transfers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Debited user
    pub from_user: i64,
    /// Credited user
    pub to_user: i64,
    pub amount: f64,
    pub note: Option<String>,
    /// Payment link that triggered the transfer, if any
    pub payment_link_id: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
