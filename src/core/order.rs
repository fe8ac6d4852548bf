//! Order lifecycle - creation, cancellation with refund and forward status changes.
//!
//! Creation and cancellation each run in one database transaction that also covers
//! the balance debit or refund and the table-session recompute, so an order is never
//! persisted without its debit and a cancellation never commits without its refund.
//! Notifications and domain events go out after commit and cannot undo the operation.

use crate::{
    config::OrderPolicy,
    core::{
        MONEY_EPSILON,
        events::{DomainEvent, EventBus},
        ledger,
        notification::{self, NewNotification},
        product::require_orderable_product,
        status, table,
        user::require_user,
    },
    entities::{
        Order, OrderItem, OrderStatus, PaymentMethod, PaymentTxKind, PaymentTxStatus,
        TableNotificationKind, TableStatus, order, order_item, payment_transaction, product,
        table_session,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// One requested line of an order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LineItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

/// Everything needed to place an order
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub items: Vec<LineItemRequest>,
    /// Total the client computed; must match the menu prices
    pub total_amount: f64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
    /// Table to bill; defaults to the table the user is seated at
    #[serde(default)]
    pub table_id: Option<i64>,
}

/// An order with its line items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// A cancelled order and the refund it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelledOrder {
    pub order: order::Model,
    /// Amount returned to the balance, for balance-paid orders
    pub refunded: Option<f64>,
}

fn validate_request(req: &NewOrder) -> Result<()> {
    if req.items.is_empty() {
        return Err(Error::validation("An order needs at least one item"));
    }
    if let Some(item) = req.items.iter().find(|i| i.quantity < 1) {
        return Err(Error::validation(format!(
            "Quantity for product {} must be at least 1, got {}",
            item.product_id, item.quantity
        )));
    }
    if !req.total_amount.is_finite() || req.total_amount <= 0.0 {
        return Err(Error::validation(format!(
            "Order total must be a positive amount, got {}",
            req.total_amount
        )));
    }
    Ok(())
}

/// Places an order at the current time. See [`create_order_at`].
pub async fn create_order(
    db: &DatabaseConnection,
    events: &EventBus,
    policy: &OrderPolicy,
    req: NewOrder,
) -> Result<OrderWithItems> {
    create_order_at(db, events, policy, req, Utc::now()).await
}

/// Places an order as of `now`.
///
/// Prices are snapshotted from the menu and the supplied total must match them. A
/// balance-paid order debits the user in the same transaction that stores it. A
/// seated user's order is linked to the table, the table's session is opened if
/// needed and its total recomputed, still in that transaction.
///
/// # Errors
/// - [`Error::Validation`] for an empty order, a bad quantity or a mismatched total
/// - [`Error::UserNotFound`], [`Error::ProductNotFound`], [`Error::TableNotFound`]
/// - [`Error::InsufficientBalance`] if a balance-paid order exceeds the balance;
///   nothing is persisted in that case
#[instrument(skip(db, events, policy, req), fields(user_id = req.user_id, method = %req.payment_method))]
pub async fn create_order_at(
    db: &DatabaseConnection,
    events: &EventBus,
    policy: &OrderPolicy,
    req: NewOrder,
    now: DateTime<Utc>,
) -> Result<OrderWithItems> {
    validate_request(&req)?;

    let txn = db.begin().await?;
    let user = require_user(&txn, req.user_id).await?;
    let table_id = match req.table_id.or(user.table_id) {
        Some(id) => Some(table::require_table(&txn, id).await?.id),
        None => None,
    };

    let mut priced: Vec<(product::Model, i32)> = Vec::with_capacity(req.items.len());
    for item in &req.items {
        let product = require_orderable_product(&txn, item.product_id).await?;
        priced.push((product, item.quantity));
    }
    let total: f64 = priced
        .iter()
        .map(|(product, quantity)| product.sale_price * f64::from(*quantity))
        .sum();
    if (total - req.total_amount).abs() > MONEY_EPSILON {
        return Err(Error::validation(format!(
            "Order total {:.2} does not match item prices {:.2}",
            req.total_amount, total
        )));
    }

    if req.payment_method == PaymentMethod::Balance {
        ledger::debit(&txn, user.id, total).await?;
    }

    let order = order::ActiveModel {
        user_id: Set(user.id),
        total_amount: Set(total),
        status: Set(req.payment_method.initial_status()),
        payment_method: Set(req.payment_method),
        notes: Set(req.notes.clone()),
        table_id: Set(table_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(priced.len());
    for (product, quantity) in &priced {
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(product.id),
            quantity: Set(*quantity),
            unit_price: Set(product.sale_price),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    if req.payment_method == PaymentMethod::Mercadopago {
        payment_transaction::ActiveModel {
            user_id: Set(user.id),
            order_id: Set(Some(order.id)),
            amount: Set(total),
            kind: Set(PaymentTxKind::Order),
            status: Set(PaymentTxStatus::Pending),
            external_payment_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let session = match table_id {
        Some(table_id) => Some(attach_to_table(&txn, table_id, order.id, now).await?),
        None => None,
    };

    let balance = match req.payment_method {
        PaymentMethod::Balance => Some(require_user(&txn, user.id).await?.balance),
        _ => None,
    };
    txn.commit().await?;

    info!(
        "Order {} created for user {}: {:.2} via {} ({})",
        order.id, user.id, total, order.payment_method, order.status
    );

    let mut notes = vec![NewNotification::order_created(user.id, order.id, total)];
    for (product, quantity) in &priced {
        let remaining = product.stock - quantity;
        if remaining < policy.low_stock_threshold {
            notes.push(NewNotification::low_stock(
                user.id,
                product.id,
                &product.name,
                remaining,
            ));
        }
    }
    notification::record_best_effort(db, notes).await;

    if let Some(table_id) = table_id {
        if let Err(e) = table::request_service(db, table_id, TableNotificationKind::NewOrder).await
        {
            warn!("Failed to notify table {} of order {}: {}", table_id, order.id, e);
        }
    }

    events.publish(DomainEvent::OrderCreated {
        order_id: order.id,
        user_id: user.id,
        table_id,
        total_amount: total,
        status: order.status,
    });
    if let Some(balance) = balance {
        events.publish(DomainEvent::BalanceUpdated {
            user_id: user.id,
            balance,
        });
    }
    if let Some(session) = &session {
        table::announce_session(events, session);
    }

    Ok(OrderWithItems { order, items })
}

/// Links the order to the table, makes sure a session is open, marks a free table
/// occupied and recomputes the session total.
async fn attach_to_table<C>(
    db: &C,
    table_id: i64,
    order_id: i64,
    now: DateTime<Utc>,
) -> Result<table_session::Model>
where
    C: ConnectionTrait,
{
    table::link_order(db, table_id, order_id, now).await?;
    let session = table::ensure_active_session(db, table_id, now).await?;

    let dining = table::require_table(db, table_id).await?;
    if matches!(dining.status, TableStatus::Free | TableStatus::Paid) {
        table::set_table_status(db, table_id, TableStatus::Occupied).await?;
    }

    Ok(table::recompute_total_spent(db, table_id)
        .await?
        .unwrap_or(session))
}

async fn require_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or(Error::OrderNotFound { id: order_id })
}

/// Cancels an order at the current time. See [`cancel_order_at`].
pub async fn cancel_order(
    db: &DatabaseConnection,
    events: &EventBus,
    policy: &OrderPolicy,
    order_id: i64,
) -> Result<CancelledOrder> {
    cancel_order_at(db, events, policy, order_id, Utc::now()).await
}

/// Cancels an order as of `now`, refunding balance-paid orders.
///
/// The status change is a guarded update on `status IN (pending, paying)`, so a
/// concurrent advance to `preparing` wins or loses cleanly. The refund commits in the
/// same transaction.
///
/// # Errors
/// - [`Error::OrderNotFound`]
/// - [`Error::NotCancellable`] if the order is `preparing`, `ready`, `delivered` or `cancelled`
/// - [`Error::CancellationWindowExpired`] if the cancellation window has elapsed
#[instrument(skip(db, events, policy))]
pub async fn cancel_order_at(
    db: &DatabaseConnection,
    events: &EventBus,
    policy: &OrderPolicy,
    order_id: i64,
    now: DateTime<Utc>,
) -> Result<CancelledOrder> {
    let txn = db.begin().await?;
    let order = require_order(&txn, order_id).await?;
    status::check_cancellable(order.id, order.status, order.created_at, now, policy)?;

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(OrderStatus::Cancelled))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Paying]))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        let fresh = require_order(&txn, order.id).await?;
        return Err(Error::NotCancellable {
            order_id: order.id,
            status: fresh.status.to_string(),
        });
    }

    let refunded = if order.payment_method == PaymentMethod::Balance {
        ledger::credit(&txn, order.user_id, order.total_amount).await?;
        Some(order.total_amount)
    } else {
        None
    };

    let session = match order.table_id {
        Some(table_id) => table::recompute_total_spent(&txn, table_id).await?,
        None => None,
    };
    let balance = match refunded {
        Some(_) => Some(require_user(&txn, order.user_id).await?.balance),
        None => None,
    };
    let cancelled = require_order(&txn, order.id).await?;
    txn.commit().await?;

    info!(
        "Order {} cancelled after {}s",
        order.id,
        status::elapsed_secs(order.created_at, now)
    );

    let mut notes = vec![NewNotification::order_cancelled(order.user_id, order.id)];
    if let Some(amount) = refunded {
        notes.push(NewNotification::refund(order.user_id, order.id, amount));
    }
    notification::record_best_effort(db, notes).await;

    events.publish(DomainEvent::OrderCancelled {
        order_id: order.id,
        user_id: order.user_id,
        refunded,
    });
    if let Some(balance) = balance {
        events.publish(DomainEvent::BalanceUpdated {
            user_id: order.user_id,
            balance,
        });
    }
    if let Some(session) = &session {
        table::announce_session(events, session);
    }

    Ok(CancelledOrder {
        order: cancelled,
        refunded,
    })
}

/// Moves an order one step forward on the given connection.
///
/// The update is guarded on the status the caller observed; if another request moved
/// the order first, the change is rejected with the status it actually has.
pub(crate) async fn advance_in<C>(
    db: &C,
    order: &order::Model,
    to: OrderStatus,
    now: DateTime<Utc>,
) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    status::check_transition(order.status, to)?;

    let result = Order::update_many()
        .col_expr(order::Column::Status, Expr::value(to))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Status.eq(order.status))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        let fresh = require_order(db, order.id).await?;
        return Err(Error::InvalidTransition {
            from: fresh.status.to_string(),
            to: to.to_string(),
        });
    }

    if let Some(table_id) = order.table_id {
        let floor = match to {
            OrderStatus::Preparing => Some(TableStatus::Preparing),
            OrderStatus::Delivered => Some(TableStatus::Delivered),
            _ => None,
        };
        if let Some(floor) = floor {
            table::set_table_status(db, table_id, floor).await?;
        }
    }

    Ok(order::Model {
        status: to,
        updated_at: now,
        ..order.clone()
    })
}

/// Advances an order to `to`, which must be its next status.
///
/// # Errors
/// - [`Error::OrderNotFound`]
/// - [`Error::InvalidTransition`] for anything but the next forward step
#[instrument(skip(db, events))]
pub async fn advance_order_status(
    db: &DatabaseConnection,
    events: &EventBus,
    order_id: i64,
    to: OrderStatus,
) -> Result<order::Model> {
    let txn = db.begin().await?;
    let order = require_order(&txn, order_id).await?;
    let updated = advance_in(&txn, &order, to, Utc::now()).await?;
    txn.commit().await?;

    info!("Order {} moved from {} to {}", order.id, order.status, to);
    events.publish(DomainEvent::OrderStatusChanged {
        order_id: order.id,
        from: order.status,
        to,
    });
    Ok(updated)
}

/// Retrieves an order with its items.
pub async fn get_order<C>(db: &C, order_id: i64) -> Result<OrderWithItems>
where
    C: ConnectionTrait,
{
    let order = require_order(db, order_id).await?;
    let items = order
        .find_related(OrderItem)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;
    Ok(OrderWithItems { order, items })
}

/// Lists a user's orders with their items, oldest first.
pub async fn list_orders_for_user<C>(db: &C, user_id: i64) -> Result<Vec<OrderWithItems>>
where
    C: ConnectionTrait,
{
    let rows = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_asc(order::Column::CreatedAt)
        .order_by_asc(order::Column::Id)
        .find_with_related(OrderItem)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(order, items)| OrderWithItems { order, items })
        .collect())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::notification::list_for_user;
    use crate::core::user::{assign_table, get_user};
    use crate::entities::NotificationKind;
    use crate::test_utils::*;
    use chrono::Duration;

    fn balance_order(user_id: i64, product_id: i64, quantity: i32, total: f64) -> NewOrder {
        NewOrder {
            user_id,
            items: vec![LineItemRequest {
                product_id,
                quantity,
            }],
            total_amount: total,
            payment_method: PaymentMethod::Balance,
            notes: None,
            table_id: None,
        }
    }

    async fn balance_of(db: &DatabaseConnection, user_id: i64) -> f64 {
        get_user(db, user_id).await.unwrap().unwrap().balance
    }

    #[tokio::test]
    async fn test_cancel_within_window_refunds() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 150.0).await?;
        let product = create_test_product(&db, "Picada", 100.0, 20).await?;

        let t0 = Utc::now();
        let created = create_order_at(
            &db,
            &events,
            &policy,
            balance_order(user.id, product.id, 1, 100.0),
            t0,
        )
        .await?;
        assert_eq!(created.order.status, OrderStatus::Pending);
        assert_eq!(balance_of(&db, user.id).await, 50.0);

        let cancelled =
            cancel_order_at(&db, &events, &policy, created.order.id, t0 + Duration::seconds(60))
                .await?;
        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.refunded, Some(100.0));
        assert_eq!(balance_of(&db, user.id).await, 150.0);

        let kinds: Vec<NotificationKind> = list_for_user(&db, user.id)
            .await?
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert!(kinds.contains(&NotificationKind::OrderCancelled));
        assert!(kinds.contains(&NotificationKind::BalanceUpdated));
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_after_window_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 150.0).await?;
        let product = create_test_product(&db, "Picada", 100.0, 20).await?;

        let t0 = Utc::now();
        let created = create_order_at(
            &db,
            &events,
            &policy,
            balance_order(user.id, product.id, 1, 100.0),
            t0,
        )
        .await?;

        let err = cancel_order_at(&db, &events, &policy, created.order.id, t0 + Duration::seconds(130))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::CancellationWindowExpired {
                elapsed_secs: 130,
                window_secs: 120,
                ..
            }
        ));
        assert_eq!(balance_of(&db, user.id).await, 50.0);
        assert_eq!(get_order(&db, created.order.id).await?.order.status, OrderStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_insufficient_balance_persists_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 99.0).await?;
        let product = create_test_product(&db, "Picada", 100.0, 20).await?;

        let err = create_order(
            &db,
            &events,
            &policy,
            balance_order(user.id, product.id, 1, 100.0),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "insufficient_balance");
        assert_eq!(balance_of(&db, user.id).await, 99.0);
        assert!(list_orders_for_user(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 500.0).await?;
        let product = create_test_product(&db, "Fernet", 40.0, 20).await?;

        let mut empty = balance_order(user.id, product.id, 1, 40.0);
        empty.items.clear();
        let zero_qty = balance_order(user.id, product.id, 0, 40.0);
        let wrong_total = balance_order(user.id, product.id, 2, 70.0);
        for req in [empty, zero_qty, wrong_total] {
            let err = create_order(&db, &events, &policy, req).await.unwrap_err();
            assert_eq!(err.kind(), "validation_error");
        }

        let missing = balance_order(user.id, 999, 1, 40.0);
        assert!(matches!(
            create_order(&db, &events, &policy, missing).await,
            Err(Error::ProductNotFound { id: 999 })
        ));
        assert_eq!(balance_of(&db, user.id).await, 500.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_snapshots_prices_and_warns_low_stock() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 500.0).await?;
        let fernet = create_test_product(&db, "Fernet", 40.0, 6).await?;
        let agua = create_test_product(&db, "Agua", 10.0, 50).await?;

        let req = NewOrder {
            user_id: user.id,
            items: vec![
                LineItemRequest {
                    product_id: fernet.id,
                    quantity: 2,
                },
                LineItemRequest {
                    product_id: agua.id,
                    quantity: 3,
                },
            ],
            total_amount: 110.0,
            payment_method: PaymentMethod::Cash,
            notes: Some("sin hielo".to_string()),
            table_id: None,
        };
        let created = create_order(&db, &events, &policy, req).await?;
        assert_eq!(created.order.status, OrderStatus::Paying);
        assert_eq!(created.order.total_amount, 110.0);
        assert_eq!(created.items.len(), 2);
        assert_eq!(created.items[0].unit_price, 40.0);
        // Cash orders do not touch the balance; stock is left to inventory
        assert_eq!(balance_of(&db, user.id).await, 500.0);
        let fernet_after = crate::core::product::get_product(&db, fernet.id).await?.unwrap();
        assert_eq!(fernet_after.stock, 6);

        let stock_alerts: Vec<_> = list_for_user(&db, user.id)
            .await?
            .into_iter()
            .filter(|n| n.kind == NotificationKind::Stock)
            .collect();
        assert_eq!(stock_alerts.len(), 1);
        assert_eq!(stock_alerts[0].metadata["product_id"], fernet.id);
        assert_eq!(stock_alerts[0].metadata["remaining"], 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_table_order_opens_session_and_counts_confirmed_spend() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 500.0).await?;
        let product = create_test_product(&db, "Pizza", 80.0, 20).await?;
        let dining = create_test_table(&db, "12").await?;
        assign_table(&db, user.id, Some(dining.id)).await?;
        assert!(table::active_session(&db, dining.id).await?.is_none());

        let created =
            create_order(&db, &events, &policy, balance_order(user.id, product.id, 1, 80.0))
                .await?;
        assert_eq!(created.order.table_id, Some(dining.id));

        let overview = table::table_status(&db, dining.id).await?;
        let session = overview.session.unwrap();
        assert_eq!(session.total_spent, 80.0);
        assert_eq!(overview.table.status, TableStatus::Occupied);
        assert_eq!(overview.orders.len(), 1);
        assert_eq!(overview.open_requests[0].kind, TableNotificationKind::NewOrder);

        let mut deferred = balance_order(user.id, product.id, 2, 160.0);
        deferred.payment_method = PaymentMethod::Mercadopago;
        create_order(&db, &events, &policy, deferred).await?;

        let again = table::active_session(&db, dining.id).await?.unwrap();
        assert_eq!(again.id, session.id);
        assert_eq!(again.total_spent, 80.0);

        cancel_order(&db, &events, &policy, created.order.id).await?;
        let after_cancel = table::active_session(&db, dining.id).await?.unwrap();
        assert_eq!(after_cancel.total_spent, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_rules_by_status() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 500.0).await?;
        let product = create_test_product(&db, "Pizza", 80.0, 20).await?;

        let created =
            create_order(&db, &events, &policy, balance_order(user.id, product.id, 1, 80.0))
                .await?;
        advance_order_status(&db, &events, created.order.id, OrderStatus::Preparing).await?;

        let err = cancel_order(&db, &events, &policy, created.order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotCancellable { ref status, .. } if status == "preparing"));
        assert_eq!(balance_of(&db, user.id).await, 420.0);

        assert!(matches!(
            cancel_order(&db, &events, &policy, 999).await,
            Err(Error::OrderNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_advance_is_forward_only() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let user = create_test_user(&db, "Ana", 0.0).await?;
        let order = insert_test_order(&db, user.id, None, 10.0, PaymentMethod::Cash).await?;

        assert!(matches!(
            advance_order_status(&db, &events, order.id, OrderStatus::Ready).await,
            Err(Error::InvalidTransition { .. })
        ));

        for next in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            let updated = advance_order_status(&db, &events, order.id, next).await?;
            assert_eq!(updated.status, next);
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            DomainEvent::OrderStatusChanged {
                from: OrderStatus::Paying,
                to: OrderStatus::Pending,
                ..
            }
        ));

        assert!(matches!(
            advance_order_status(&db, &events, order.id, OrderStatus::Pending).await,
            Err(Error::InvalidTransition { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_oldest_first_with_items() -> Result<()> {
        let db = setup_test_db().await?;
        let events = EventBus::default();
        let policy = OrderPolicy::default();
        let user = create_test_user(&db, "Ana", 500.0).await?;
        let product = create_test_product(&db, "Pizza", 80.0, 20).await?;

        let t0 = Utc::now();
        let first = create_order_at(
            &db,
            &events,
            &policy,
            balance_order(user.id, product.id, 1, 80.0),
            t0,
        )
        .await?;
        let second = create_order_at(
            &db,
            &events,
            &policy,
            balance_order(user.id, product.id, 2, 160.0),
            t0 + Duration::seconds(5),
        )
        .await?;

        let listed = list_orders_for_user(&db, user.id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].order.id, first.order.id);
        assert_eq!(listed[1].order.id, second.order.id);
        assert_eq!(listed[1].items[0].quantity, 2);
        Ok(())
    }
}
