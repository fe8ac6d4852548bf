//! User-facing notifications.
//!
//! Notifications are written after the operation that caused them has committed. A
//! failed write is logged and dropped; it never fails the caller.

use crate::{
    entities::{Notification, NotificationKind, notification},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde_json::json;
use tracing::warn;

/// A notification waiting to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: serde_json::Value,
}

impl NewNotification {
    /// Confirmation that an order was placed.
    #[must_use]
    pub fn order_created(user_id: i64, order_id: i64, total_amount: f64) -> Self {
        Self {
            user_id,
            kind: NotificationKind::Order,
            title: "Order placed".to_string(),
            message: format!("Your order #{order_id} for ${total_amount:.2} was received."),
            metadata: json!({ "order_id": order_id, "total_amount": total_amount }),
        }
    }

    /// Warning that an ordered product is running out. `remaining` is clamped at zero.
    #[must_use]
    pub fn low_stock(user_id: i64, product_id: i64, product_name: &str, remaining: i32) -> Self {
        let remaining = remaining.max(0);
        Self {
            user_id,
            kind: NotificationKind::Stock,
            title: "Low stock".to_string(),
            message: format!("Only {remaining} left of {product_name}."),
            metadata: json!({ "product_id": product_id, "remaining": remaining }),
        }
    }

    #[must_use]
    pub fn order_cancelled(user_id: i64, order_id: i64) -> Self {
        Self {
            user_id,
            kind: NotificationKind::OrderCancelled,
            title: "Order cancelled".to_string(),
            message: format!("Your order #{order_id} was cancelled."),
            metadata: json!({ "order_id": order_id }),
        }
    }

    #[must_use]
    pub fn refund(user_id: i64, order_id: i64, amount: f64) -> Self {
        Self {
            user_id,
            kind: NotificationKind::BalanceUpdated,
            title: "Refund issued".to_string(),
            message: format!("${amount:.2} from order #{order_id} was returned to your balance."),
            metadata: json!({ "order_id": order_id, "amount": amount }),
        }
    }

    /// Balance credited by a top-up or an incoming transfer.
    #[must_use]
    pub fn balance_credited(user_id: i64, amount: f64, reason: &str) -> Self {
        Self {
            user_id,
            kind: NotificationKind::BalanceUpdated,
            title: "Balance credited".to_string(),
            message: format!("${amount:.2} was added to your balance ({reason})."),
            metadata: json!({ "amount": amount, "reason": reason }),
        }
    }
}

/// Stores a batch of notifications.
pub async fn record<C>(db: &C, notifications: Vec<NewNotification>) -> Result<()>
where
    C: ConnectionTrait,
{
    if notifications.is_empty() {
        return Ok(());
    }

    let now = chrono::Utc::now();
    let rows = notifications.into_iter().map(|n| notification::ActiveModel {
        user_id: Set(n.user_id),
        kind: Set(n.kind),
        title: Set(n.title),
        message: Set(n.message),
        metadata: Set(n.metadata),
        created_at: Set(now),
        ..Default::default()
    });
    Notification::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Stores notifications, logging instead of failing.
pub async fn record_best_effort<C>(db: &C, notifications: Vec<NewNotification>)
where
    C: ConnectionTrait,
{
    let count = notifications.len();
    if let Err(e) = record(db, notifications).await {
        warn!("Failed to record {} notifications: {}", count, e);
    }
}

/// Lists a user's notifications, newest first.
pub async fn list_for_user<C>(db: &C, user_id: i64) -> Result<Vec<notification::Model>>
where
    C: ConnectionTrait,
{
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_low_stock_clamps_remaining() {
        let n = NewNotification::low_stock(1, 2, "Fernet", -3);
        assert_eq!(n.kind, NotificationKind::Stock);
        assert_eq!(n.message, "Only 0 left of Fernet.");
        assert_eq!(n.metadata["remaining"], 0);
    }

    #[tokio::test]
    async fn test_record_and_list_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "Ana", 0.0).await?;

        record(&db, vec![]).await?;
        record(
            &db,
            vec![
                NewNotification::order_created(user.id, 1, 100.0),
                NewNotification::order_cancelled(user.id, 1),
            ],
        )
        .await?;

        let listed = list_for_user(&db, user.id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].kind, NotificationKind::OrderCancelled);
        assert_eq!(listed[1].metadata["order_id"], 1);
        Ok(())
    }
}
