//! Database configuration module for `Barflow`.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    BalanceTransfer, DiningTable, Gift, Notification, Order, OrderItem, PaymentLink,
    PaymentTransaction, Product, TableNotification, TableOrder, TableSession, User,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, EntityTrait, Schema,
};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/barflow.sqlite?mode=rwc";

/// At most one active session per table, enforced by the store
const ONE_ACTIVE_SESSION_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     idx_table_sessions_one_active ON table_sessions (table_id) WHERE status = 'active'";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file if no environment variable is set. The returned
/// connection is the single store handle passed into every core operation.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table_for<C, E>(db: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Existing tables are left untouched, so this is safe to run on every start.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    create_table_for(db, User).await?;
    create_table_for(db, Product).await?;
    create_table_for(db, DiningTable).await?;
    create_table_for(db, Order).await?;
    create_table_for(db, OrderItem).await?;
    create_table_for(db, TableSession).await?;
    create_table_for(db, TableOrder).await?;
    create_table_for(db, TableNotification).await?;
    create_table_for(db, PaymentLink).await?;
    create_table_for(db, BalanceTransfer).await?;
    create_table_for(db, PaymentTransaction).await?;
    create_table_for(db, Notification).await?;
    create_table_for(db, Gift).await?;

    // Partial indexes are not expressible through the entity schema
    match db.get_database_backend() {
        DatabaseBackend::Sqlite | DatabaseBackend::Postgres => {
            db.execute_unprepared(ONE_ACTIVE_SESSION_INDEX).await?;
        }
        DatabaseBackend::MySql => {}
    }

    info!("Database tables ensured.");
    Ok(())
}
