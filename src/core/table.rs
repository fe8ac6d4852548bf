//! Dining tables and table sessions.
//!
//! A table has at most one `active` session. Orders placed by seated users are linked
//! to the table, and the active session's `total_spent` is recomputed from all of
//! them whenever an order is created, cancelled or its payment is confirmed. The total
//! is always overwritten with a full recomputation, so running it twice or
//! concurrently is harmless and a missed trigger heals on the next one.

use crate::{
    core::events::{DomainEvent, EventBus},
    entities::{
        DiningTable, Order, OrderStatus, PaymentMethod, PaymentTransaction, PaymentTxStatus,
        SessionStatus, TableNotification, TableNotificationKind, TableOrder, TableSession,
        TableStatus, User, dining_table, order, payment_transaction, table_notification,
        table_order, table_session, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, SqlErr, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Creates a free table.
///
/// # Errors
/// Returns [`Error::Validation`] if the number is empty or the capacity is not positive.
pub async fn create_table<C>(db: &C, table_number: &str, capacity: i32) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    if table_number.trim().is_empty() {
        return Err(Error::validation("Table number cannot be empty"));
    }
    if capacity <= 0 {
        return Err(Error::validation(format!(
            "Table capacity must be positive, got {capacity}"
        )));
    }

    dining_table::ActiveModel {
        table_number: Set(table_number.trim().to_string()),
        capacity: Set(capacity),
        status: Set(TableStatus::Free),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Retrieves a table, failing with [`Error::TableNotFound`] if absent.
pub async fn require_table<C>(db: &C, table_id: i64) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    DiningTable::find_by_id(table_id)
        .one(db)
        .await?
        .ok_or(Error::TableNotFound { id: table_id })
}

/// Returns the table's active session, the most recently started one if several exist.
pub async fn active_session<C>(db: &C, table_id: i64) -> Result<Option<table_session::Model>>
where
    C: ConnectionTrait,
{
    TableSession::find()
        .filter(table_session::Column::TableId.eq(table_id))
        .filter(table_session::Column::Status.eq(SessionStatus::Active))
        .order_by_desc(table_session::Column::StartedAt)
        .order_by_desc(table_session::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the table's active session, opening a new one with a zero total if none is
/// active. Closed sessions are never reopened.
pub async fn ensure_active_session<C>(
    db: &C,
    table_id: i64,
    now: DateTime<Utc>,
) -> Result<table_session::Model>
where
    C: ConnectionTrait,
{
    if let Some(session) = active_session(db, table_id).await? {
        return Ok(session);
    }

    let inserted = table_session::ActiveModel {
        table_id: Set(table_id),
        started_at: Set(now),
        ended_at: Set(None),
        total_spent: Set(0.0),
        status: Set(SessionStatus::Active),
        ..Default::default()
    }
    .insert(db)
    .await;
    let session = match inserted {
        Ok(session) => session,
        // Another writer opened the session first; the unique index kept it single
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return match active_session(db, table_id).await? {
                Some(session) => Ok(session),
                None => Err(e.into()),
            };
        }
        Err(e) => return Err(e.into()),
    };
    info!("Opened session {} for table {}", session.id, table_id);
    Ok(session)
}

/// Links an order to a table.
pub async fn link_order<C>(
    db: &C,
    table_id: i64,
    order_id: i64,
    now: DateTime<Utc>,
) -> Result<table_order::Model>
where
    C: ConnectionTrait,
{
    table_order::ActiveModel {
        table_id: Set(table_id),
        order_id: Set(order_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Loads every order linked to the table, oldest first.
pub async fn linked_orders<C>(db: &C, table_id: i64) -> Result<Vec<order::Model>>
where
    C: ConnectionTrait,
{
    let order_ids: Vec<i64> = TableOrder::find()
        .filter(table_order::Column::TableId.eq(table_id))
        .all(db)
        .await?
        .into_iter()
        .map(|link| link.order_id)
        .collect();
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    Order::find()
        .filter(order::Column::Id.is_in(order_ids))
        .order_by_asc(order::Column::CreatedAt)
        .order_by_asc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sums the confirmed spend of the given orders.
///
/// Cash and balance orders count at creation. Gateway-paid orders count only once an
/// approved payment transaction references them. Cancelled orders never count.
pub async fn confirmed_spend<C>(db: &C, orders: &[order::Model]) -> Result<f64>
where
    C: ConnectionTrait,
{
    let deferred: Vec<i64> = orders
        .iter()
        .filter(|o| !o.payment_method.is_confirmed_at_creation())
        .map(|o| o.id)
        .collect();

    let approved: HashSet<i64> = if deferred.is_empty() {
        HashSet::new()
    } else {
        PaymentTransaction::find()
            .filter(payment_transaction::Column::OrderId.is_in(deferred))
            .filter(payment_transaction::Column::Status.eq(PaymentTxStatus::Approved))
            .all(db)
            .await?
            .into_iter()
            .filter_map(|tx| tx.order_id)
            .collect()
    };

    let total = orders
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .filter(|o| match o.payment_method {
            PaymentMethod::Balance | PaymentMethod::Cash => true,
            PaymentMethod::Mercadopago => approved.contains(&o.id),
        })
        .map(|o| o.total_amount)
        .sum();
    Ok(total)
}

/// Recomputes the active session's `total_spent` from every order linked to the table
/// and overwrites it.
///
/// Returns the updated session, or `None` (a total of 0) when the table has no active
/// session.
#[instrument(skip(db))]
pub async fn recompute_total_spent<C>(db: &C, table_id: i64) -> Result<Option<table_session::Model>>
where
    C: ConnectionTrait,
{
    let Some(session) = active_session(db, table_id).await? else {
        debug!("Table {} has no active session to recompute", table_id);
        return Ok(None);
    };

    let orders = linked_orders(db, table_id).await?;
    let total = confirmed_spend(db, &orders).await?;

    TableSession::update_many()
        .col_expr(table_session::Column::TotalSpent, Expr::value(total))
        .filter(table_session::Column::Id.eq(session.id))
        .exec(db)
        .await?;
    debug!(
        "Session {} of table {} now totals {:.2}",
        session.id, table_id, total
    );

    Ok(Some(table_session::Model {
        total_spent: total,
        ..session
    }))
}

/// Sets a table's floor status.
pub async fn set_table_status<C>(
    db: &C,
    table_id: i64,
    status: TableStatus,
) -> Result<dining_table::Model>
where
    C: ConnectionTrait,
{
    let table = require_table(db, table_id).await?;
    if table.status == status {
        return Ok(table);
    }
    let mut active: dining_table::ActiveModel = table.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Publishes the session's current total.
pub fn announce_session(events: &EventBus, session: &table_session::Model) {
    events.publish(DomainEvent::TableSessionUpdated {
        table_id: session.table_id,
        session_id: session.id,
        total_spent: session.total_spent,
    });
}

/// Ends the table's sitting: the active session is closed, the table is freed and
/// everyone seated there is unseated. The next order from the table opens a new session.
///
/// Returns the closed session, or `None` if no session was active.
#[instrument(skip(db, events))]
pub async fn close_session(
    db: &DatabaseConnection,
    events: &EventBus,
    table_id: i64,
) -> Result<Option<table_session::Model>> {
    let txn = db.begin().await?;
    require_table(&txn, table_id).await?;

    let closed = match active_session(&txn, table_id).await? {
        Some(session) => {
            let session = recompute_total_spent(&txn, table_id)
                .await?
                .unwrap_or(session);
            let mut active: table_session::ActiveModel = session.into();
            active.status = Set(SessionStatus::Closed);
            active.ended_at = Set(Some(Utc::now()));
            Some(active.update(&txn).await?)
        }
        None => None,
    };

    set_table_status(&txn, table_id, TableStatus::Free).await?;
    User::update_many()
        .col_expr(user::Column::TableId, Expr::value(Option::<i64>::None))
        .filter(user::Column::TableId.eq(table_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    if let Some(session) = &closed {
        info!(
            "Closed session {} of table {} at {:.2}",
            session.id, table_id, session.total_spent
        );
        announce_session(events, session);
    }
    Ok(closed)
}

/// Records a service request (waiter call, bill request, ...) for staff.
///
/// A bill request also moves the table to `bill_requested`.
#[instrument(skip(db))]
pub async fn request_service<C>(
    db: &C,
    table_id: i64,
    kind: TableNotificationKind,
) -> Result<table_notification::Model>
where
    C: ConnectionTrait,
{
    require_table(db, table_id).await?;
    if kind == TableNotificationKind::BillRequest {
        set_table_status(db, table_id, TableStatus::BillRequested).await?;
    }

    table_notification::ActiveModel {
        table_id: Set(table_id),
        kind: Set(kind),
        resolved_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists a table's unresolved service requests, oldest first.
pub async fn open_requests<C>(db: &C, table_id: i64) -> Result<Vec<table_notification::Model>>
where
    C: ConnectionTrait,
{
    TableNotification::find()
        .filter(table_notification::Column::TableId.eq(table_id))
        .filter(table_notification::Column::ResolvedAt.is_null())
        .order_by_asc(table_notification::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A table with its current sitting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOverview {
    pub table: dining_table::Model,
    pub session: Option<table_session::Model>,
    pub orders: Vec<order::Model>,
    pub open_requests: Vec<table_notification::Model>,
}

/// Current state of a table: its active session, linked orders and open requests.
pub async fn table_status<C>(db: &C, table_id: i64) -> Result<TableOverview>
where
    C: ConnectionTrait,
{
    let table = require_table(db, table_id).await?;
    let session = active_session(db, table_id).await?;
    let orders = linked_orders(db, table_id).await?;
    let open_requests = open_requests(db, table_id).await?;
    Ok(TableOverview {
        table,
        session,
        orders,
        open_requests,
    })
}
