//! Gifts - products one user gives another, redeemed at the bar.

use crate::{
    core::{
        events::{DomainEvent, EventBus},
        product::require_orderable_product,
        user::require_user,
    },
    entities::{Gift, GiftStatus, gift},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// Gives `quantity` units of a product from `sender_id` to `user_id`.
#[instrument(skip(db, description))]
pub async fn send_gift<C>(
    db: &C,
    sender_id: i64,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    description: Option<String>,
) -> Result<gift::Model>
where
    C: ConnectionTrait,
{
    if quantity < 1 {
        return Err(Error::validation(format!(
            "Gift quantity must be at least 1, got {quantity}"
        )));
    }
    if sender_id == user_id {
        return Err(Error::InvalidRecipient);
    }
    require_user(db, sender_id).await?;
    require_user(db, user_id).await?;
    require_orderable_product(db, product_id).await?;

    gift::ActiveModel {
        user_id: Set(user_id),
        sender_id: Set(sender_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        description: Set(description),
        status: Set(GiftStatus::Pending),
        created_at: Set(Utc::now()),
        redeemed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists the gifts a user has received, newest first.
pub async fn list_gifts<C>(db: &C, user_id: i64) -> Result<Vec<gift::Model>>
where
    C: ConnectionTrait,
{
    Gift::find()
        .filter(gift::Column::UserId.eq(user_id))
        .order_by_desc(gift::Column::CreatedAt)
        .order_by_desc(gift::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Redeems a gift for its owner. A gift can be redeemed once.
///
/// # Errors
/// - [`Error::GiftNotFound`] if the gift does not exist
/// - [`Error::Validation`] if `user_id` is not the recipient
/// - [`Error::InvalidTransition`] if it was already redeemed
#[instrument(skip(db, events))]
pub async fn redeem_gift(
    db: &DatabaseConnection,
    events: &EventBus,
    gift_id: i64,
    user_id: i64,
) -> Result<gift::Model> {
    let gift = Gift::find_by_id(gift_id)
        .one(db)
        .await?
        .ok_or(Error::GiftNotFound { id: gift_id })?;
    if gift.user_id != user_id {
        return Err(Error::validation(format!(
            "Gift {gift_id} does not belong to user {user_id}"
        )));
    }

    let now = Utc::now();
    let result = Gift::update_many()
        .col_expr(gift::Column::Status, Expr::value(GiftStatus::Redeemed))
        .col_expr(gift::Column::RedeemedAt, Expr::value(now))
        .filter(gift::Column::Id.eq(gift_id))
        .filter(gift::Column::Status.eq(GiftStatus::Pending))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::InvalidTransition {
            from: "redeemed".to_string(),
            to: "redeemed".to_string(),
        });
    }

    info!("Gift {} redeemed by user {}", gift_id, user_id);
    events.publish(DomainEvent::GiftRedeemed { gift_id, user_id });
    Ok(gift::Model {
        status: GiftStatus::Redeemed,
        redeemed_at: Some(now),
        ..gift
    })
}
