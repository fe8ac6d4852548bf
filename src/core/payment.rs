//! External payment gateway - webhooks for deferred order payments and balance top-ups.
//!
//! Each charge is a `payment_transactions` row whose id travels to the gateway as the
//! external reference. Webhook notifications only carry the gateway's payment id, so
//! the payment is fetched back from the gateway before anything is applied. Approval
//! is a guarded update on `status <> approved`; a repeated notification for the same
//! payment changes nothing.

use crate::{
    core::{
        events::{DomainEvent, EventBus},
        ledger,
        notification::{self, NewNotification},
        order::advance_in,
        table,
        user::require_user,
    },
    entities::{
        Order, OrderStatus, PaymentTransaction, PaymentTxKind, PaymentTxStatus,
        payment_transaction,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Gateway status string for a settled payment
pub const STATUS_APPROVED: &str = "approved";

const HANDLED_EVENTS: [&str; 2] = ["payment.created", "payment.updated"];

/// A payment as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    /// Our payment transaction id, as sent when the charge was created
    pub external_reference: Option<String>,
}

/// Read access to the external payment gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Fetches the current state of a payment.
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

/// Mercado Pago REST client built on reqwest.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoPayment {
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoClient {
    /// Builds a client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns [`Error::ExternalService`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService {
                message: format!("payment {payment_id} lookup failed with {status}: {body}"),
            });
        }

        let payment: MercadoPagoPayment = response.json().await?;
        let id = match payment.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };
        Ok(GatewayPayment {
            id,
            status: payment.status,
            external_reference: payment.external_reference,
        })
    }
}

/// What a webhook notification did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// Not a payment event, or no matching transaction
    Ignored,
    /// The payment is not approved (yet)
    NotApproved,
    /// The transaction was already approved by an earlier notification
    AlreadyProcessed,
    /// The approval was applied
    Applied,
    /// The order was cancelled before the payment settled; the amount went to the balance
    Refunded,
}

/// Creates a pending top-up charge. The balance is credited when the gateway approves it.
#[instrument(skip(db))]
pub async fn create_topup<C>(db: &C, user_id: i64, amount: f64) -> Result<payment_transaction::Model>
where
    C: ConnectionTrait,
{
    ledger::validate_amount(amount)?;
    require_user(db, user_id).await?;

    let now = Utc::now();
    payment_transaction::ActiveModel {
        user_id: Set(user_id),
        order_id: Set(None),
        amount: Set(amount),
        kind: Set(PaymentTxKind::Topup),
        status: Set(PaymentTxStatus::Pending),
        external_payment_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

fn parse_reference(payment: &GatewayPayment) -> Option<i64> {
    payment
        .external_reference
        .as_deref()
        .and_then(|reference| reference.trim().parse().ok())
}

/// Applies a gateway notification.
///
/// On approval the transaction is marked approved, a linked order moves from `paying`
/// to `pending`, a top-up is credited to the balance and the table session of a table
/// order is recomputed. Safe to call any number of times for the same payment.
///
/// # Errors
/// - [`Error::ExternalService`] if the gateway cannot be reached
/// - [`Error::Database`] if the store fails; nothing is applied in that case
#[instrument(skip(db, events, gateway))]
pub async fn handle_payment_event(
    db: &DatabaseConnection,
    events: &EventBus,
    gateway: &dyn PaymentGateway,
    event_type: &str,
    payment_id: &str,
) -> Result<WebhookOutcome> {
    if !HANDLED_EVENTS.contains(&event_type) {
        return Ok(WebhookOutcome::Ignored);
    }

    let payment = gateway.fetch_payment(payment_id).await?;
    let Some(transaction_id) = parse_reference(&payment) else {
        warn!(
            "Payment {} has no usable external reference: {:?}",
            payment.id, payment.external_reference
        );
        return Ok(WebhookOutcome::Ignored);
    };

    let txn = db.begin().await?;
    let Some(tx) = PaymentTransaction::find_by_id(transaction_id).one(&txn).await? else {
        warn!(
            "Payment {} references unknown transaction {}",
            payment.id, transaction_id
        );
        return Ok(WebhookOutcome::Ignored);
    };
    let now = Utc::now();

    if payment.status != STATUS_APPROVED {
        if matches!(payment.status.as_str(), "rejected" | "cancelled") {
            PaymentTransaction::update_many()
                .col_expr(
                    payment_transaction::Column::Status,
                    Expr::value(PaymentTxStatus::Rejected),
                )
                .col_expr(
                    payment_transaction::Column::ExternalPaymentId,
                    Expr::value(payment.id.clone()),
                )
                .col_expr(payment_transaction::Column::UpdatedAt, Expr::value(now))
                .filter(payment_transaction::Column::Id.eq(tx.id))
                .filter(payment_transaction::Column::Status.eq(PaymentTxStatus::Pending))
                .exec(&txn)
                .await?;
            txn.commit().await?;
        }
        info!(
            "Payment {} for transaction {} is {}",
            payment.id, tx.id, payment.status
        );
        return Ok(WebhookOutcome::NotApproved);
    }

    let approved = PaymentTransaction::update_many()
        .col_expr(
            payment_transaction::Column::Status,
            Expr::value(PaymentTxStatus::Approved),
        )
        .col_expr(
            payment_transaction::Column::ExternalPaymentId,
            Expr::value(payment.id.clone()),
        )
        .col_expr(payment_transaction::Column::UpdatedAt, Expr::value(now))
        .filter(payment_transaction::Column::Id.eq(tx.id))
        .filter(payment_transaction::Column::Status.ne(PaymentTxStatus::Approved))
        .exec(&txn)
        .await?;
    if approved.rows_affected == 0 {
        info!("Transaction {} was already approved", tx.id);
        return Ok(WebhookOutcome::AlreadyProcessed);
    }

    let mut advanced = None;
    let mut refunded = None;
    let mut table_id = None;
    let mut balance = None;
    match tx.kind {
        PaymentTxKind::Order => {
            let order = match tx.order_id {
                Some(order_id) => Order::find_by_id(order_id).one(&txn).await?,
                None => None,
            };
            if let Some(order) = order {
                table_id = order.table_id;
                match order.status {
                    OrderStatus::Paying => {
                        advance_in(&txn, &order, OrderStatus::Pending, now).await?;
                        advanced = Some(order.id);
                    }
                    // Paid after cancellation; the amount goes to the balance
                    OrderStatus::Cancelled => {
                        ledger::credit(&txn, tx.user_id, tx.amount).await?;
                        balance = Some(require_user(&txn, tx.user_id).await?.balance);
                        refunded = Some(order.id);
                    }
                    _ => {}
                }
            }
        }
        PaymentTxKind::Topup => {
            ledger::credit(&txn, tx.user_id, tx.amount).await?;
            balance = Some(require_user(&txn, tx.user_id).await?.balance);
        }
    }
    txn.commit().await?;
    info!(
        "Payment {} approved transaction {} ({:.2})",
        payment.id, tx.id, tx.amount
    );

    events.publish(DomainEvent::PaymentApproved {
        transaction_id: tx.id,
        order_id: tx.order_id,
    });
    if let Some(order_id) = advanced {
        events.publish(DomainEvent::OrderStatusChanged {
            order_id,
            from: OrderStatus::Paying,
            to: OrderStatus::Pending,
        });
    }
    if let Some(balance) = balance {
        let notice = match refunded {
            Some(order_id) => NewNotification::refund(tx.user_id, order_id, tx.amount),
            None => NewNotification::balance_credited(tx.user_id, tx.amount, "top-up"),
        };
        notification::record_best_effort(db, vec![notice]).await;
        events.publish(DomainEvent::BalanceUpdated {
            user_id: tx.user_id,
            balance,
        });
    }
    if let Some(table_id) = table_id {
        match table::recompute_total_spent(db, table_id).await {
            Ok(Some(session)) => table::announce_session(events, &session),
            Ok(None) => {}
            Err(e) => warn!("Failed to recompute session of table {}: {}", table_id, e),
        }
    }

    if let Some(order_id) = refunded {
        info!(
            "Credited {:.2} to user {} for cancelled order {}",
            tx.amount, tx.user_id, order_id
        );
        return Ok(WebhookOutcome::Refunded);
    }
    Ok(WebhookOutcome::Applied)
}
