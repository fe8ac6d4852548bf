//! User business logic - accounts, lookup by email and table seating.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, prelude::*};
use tracing::instrument;

/// Creates a user with an opening balance.
///
/// # Errors
/// Returns [`Error::Validation`] if the name or email is empty or the balance is negative
/// or not finite.
#[instrument(skip(db))]
pub async fn create_user<C>(db: &C, name: &str, email: &str, balance: f64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::validation("User name cannot be empty"));
    }
    if email.trim().is_empty() || !email.contains('@') {
        return Err(Error::validation(format!("Invalid email address '{email}'")));
    }
    if !balance.is_finite() || balance < 0.0 {
        return Err(Error::validation(format!("Invalid opening balance {balance}")));
    }

    let user = user::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(normalize_email(email)),
        balance: Set(balance),
        table_id: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    user.insert(db).await.map_err(Into::into)
}

/// Retrieves a user by ID.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Retrieves a user by ID, failing with [`Error::UserNotFound`] if absent.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user(db, user_id)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            identifier: user_id.to_string(),
        })
}

/// Finds a user by email. Matching ignores case and surrounding whitespace.
pub async fn find_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Seats the user at a table, or unseats them with `None`.
///
/// Orders placed while seated are linked to the table's session.
#[instrument(skip(db))]
pub async fn assign_table<C>(db: &C, user_id: i64, table_id: Option<i64>) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = require_user(db, user_id).await?;
    if let Some(table_id) = table_id {
        crate::core::table::require_table(db, table_id).await?;
    }

    let mut active: user::ActiveModel = user.into();
    active.table_id = Set(table_id);
    active.update(db).await.map_err(Into::into)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
