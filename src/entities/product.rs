//! Product entity - A menu item that can be ordered.
//!
//! The sale price is snapshotted into each order item at order time, so later price
//! changes never alter historical orders. Stock is informational for the ordering flow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name shown on the menu (e.g., "Fernet con coca")
    #[sea_orm(unique)]
    pub name: String,
    /// Menu section (e.g., "drinks", "food")
    pub category: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Current price per unit
    pub sale_price: f64,
    /// Units on hand as reported by inventory
    pub stock: i32,
    /// Whether the product can currently be ordered
    pub is_active: bool,
    /// Soft delete flag - if true, product is hidden but data is preserved
    pub is_deleted: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
