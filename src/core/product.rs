//! Product business logic - Handles menu browsing and product management.
//!
//! Products are the menu items customers order. Orders snapshot the sale price, so
//! editing a product never changes existing orders. Ordering reads stock for low-stock
//! alerts but never changes it; inventory owns stock levels.

use crate::{
    config::ProductSeed,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Retrieves all orderable (active, non-deleted) products, ordered alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_products(db: &DatabaseConnection) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::IsDeleted.eq(false))
        .filter(product::Column::IsActive.eq(true))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific product by its unique ID.
pub async fn get_product<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a product by its name, returning None if not found or deleted.
pub async fn get_product_by_name<C>(db: &C, name: &str) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find()
        .filter(product::Column::Name.eq(name))
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a product that can currently be ordered.
///
/// # Errors
/// Returns [`Error::ProductNotFound`] if the product does not exist, is deleted or inactive.
pub async fn require_orderable_product<C>(db: &C, product_id: i64) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    match get_product(db, product_id).await? {
        Some(product) if product.is_active && !product.is_deleted => Ok(product),
        _ => Err(Error::ProductNotFound { id: product_id }),
    }
}

/// Creates a new product with the specified parameters, performing input validation.
///
/// # Errors
/// Returns an error if:
/// - The product name is empty or whitespace-only
/// - The price is negative or not finite (NaN, infinity)
/// - The stock is negative
/// - The database insert operation fails
pub async fn create_product<C>(db: &C, seed: &ProductSeed) -> Result<product::Model>
where
    C: ConnectionTrait,
{
    if seed.name.trim().is_empty() {
        return Err(Error::validation("Product name cannot be empty"));
    }

    if !seed.sale_price.is_finite() || seed.sale_price < 0.0 {
        return Err(Error::validation(format!(
            "Invalid sale price {} for product '{}'",
            seed.sale_price, seed.name
        )));
    }

    if seed.stock < 0 {
        return Err(Error::validation(format!(
            "Stock cannot be negative for product '{}'",
            seed.name
        )));
    }

    let now = chrono::Utc::now();

    let product = product::ActiveModel {
        name: Set(seed.name.trim().to_string()),
        category: Set(seed.category.clone()),
        description: Set(seed.description.clone()),
        sale_price: Set(seed.sale_price),
        stock: Set(seed.stock),
        is_active: Set(true),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    product.insert(db).await.map_err(Into::into)
}

/// Inserts every configured product that is not already on the menu.
///
/// Products are matched by name; existing rows are never modified. Returns the number
/// of products inserted.
#[instrument(skip(db, seeds), fields(configured = seeds.len()))]
pub async fn seed_products(db: &DatabaseConnection, seeds: &[ProductSeed]) -> Result<usize> {
    let mut inserted = 0;
    for seed in seeds {
        if get_product_by_name(db, seed.name.trim()).await?.is_some() {
            continue;
        }
        create_product(db, seed).await?;
        inserted += 1;
    }
    info!("Seeded {} new products.", inserted);
    Ok(inserted)
}
