//! Balance ledger - every mutation of a user's balance goes through here.
//!
//! Debits are a single guarded `UPDATE ... WHERE balance >= amount`, so two concurrent
//! debits can never overdraw an account. Composite operations (transfers, link
//! redemption) run inside one transaction and either fully apply or not at all.

use crate::{
    core::{
        MONEY_EPSILON,
        events::{DomainEvent, EventBus},
        notification::{self, NewNotification},
        user::{find_user_by_email, require_user},
    },
    entities::{
        BalanceTransfer, LinkStatus, PaymentLink, PaymentTransaction, PaymentTxKind,
        PaymentTxStatus, User, balance_transfer, payment_link, payment_transaction, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument};

/// Decreases a user's balance, failing if it would go negative.
///
/// The balance check and the decrement are one statement.
///
/// # Errors
/// - [`Error::UserNotFound`] if the user does not exist
/// - [`Error::InsufficientBalance`] if the balance is below `amount`
pub async fn debit<C>(db: &C, user_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).sub(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::Balance.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let user = require_user(db, user_id).await?;
        return Err(Error::InsufficientBalance {
            current: user.balance,
            required: amount,
        });
    }
    Ok(())
}

/// Increases a user's balance unconditionally.
///
/// # Errors
/// Returns [`Error::UserNotFound`] if the user does not exist.
pub async fn credit<C>(db: &C, user_id: i64, amount: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(
            user::Column::Balance,
            Expr::col(user::Column::Balance).add(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::UserNotFound {
            identifier: user_id.to_string(),
        });
    }
    Ok(())
}

/// Validates a transfer or link amount.
pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < MONEY_EPSILON {
        return Err(Error::validation(format!(
            "Amount must be a positive number, got {amount}"
        )));
    }
    Ok(())
}

/// Moves `amount` from one user to another on the given connection and records it.
///
/// Callers run this inside a transaction so the debit, the credit and the record
/// commit together.
async fn transfer_in<C>(
    db: &C,
    from_user: i64,
    to_user: i64,
    amount: f64,
    note: Option<String>,
    payment_link_id: Option<i64>,
) -> Result<balance_transfer::Model>
where
    C: ConnectionTrait,
{
    validate_amount(amount)?;
    if from_user == to_user {
        return Err(Error::InvalidRecipient);
    }
    require_user(db, to_user).await?;

    debit(db, from_user, amount).await?;
    credit(db, to_user, amount).await?;

    let record = balance_transfer::ActiveModel {
        from_user: Set(from_user),
        to_user: Set(to_user),
        amount: Set(amount),
        note: Set(note),
        payment_link_id: Set(payment_link_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    record.insert(db).await.map_err(Into::into)
}

/// A committed transfer and the balances it left behind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    pub transfer: balance_transfer::Model,
    pub sender_balance: f64,
    pub recipient_balance: f64,
}

async fn finish_transfer<C>(db: &C, transfer: balance_transfer::Model) -> Result<TransferReceipt>
where
    C: ConnectionTrait,
{
    let sender_balance = require_user(db, transfer.from_user).await?.balance;
    let recipient_balance = require_user(db, transfer.to_user).await?.balance;
    Ok(TransferReceipt {
        transfer,
        sender_balance,
        recipient_balance,
    })
}

async fn announce_transfer(db: &DatabaseConnection, events: &EventBus, receipt: &TransferReceipt) {
    let transfer = &receipt.transfer;
    notification::record_best_effort(
        db,
        vec![NewNotification::balance_credited(
            transfer.to_user,
            transfer.amount,
            "transfer",
        )],
    )
    .await;
    events.publish(DomainEvent::BalanceUpdated {
        user_id: transfer.from_user,
        balance: receipt.sender_balance,
    });
    events.publish(DomainEvent::BalanceUpdated {
        user_id: transfer.to_user,
        balance: receipt.recipient_balance,
    });
}

/// Transfers balance between two users atomically.
///
/// # Errors
/// - [`Error::Validation`] if the amount is not positive
/// - [`Error::InvalidRecipient`] if sender and recipient are the same user
/// - [`Error::UserNotFound`] if either user does not exist
/// - [`Error::InsufficientBalance`] if the sender cannot cover the amount
#[instrument(skip(db, events, note))]
pub async fn transfer(
    db: &DatabaseConnection,
    events: &EventBus,
    from_user: i64,
    to_user: i64,
    amount: f64,
    note: Option<String>,
) -> Result<TransferReceipt> {
    let txn = db.begin().await?;
    let transfer = transfer_in(&txn, from_user, to_user, amount, note, None).await?;
    let receipt = finish_transfer(&txn, transfer).await?;
    txn.commit().await?;

    info!(
        "Transferred {:.2} from user {} to user {}",
        amount, from_user, to_user
    );
    announce_transfer(db, events, &receipt).await;
    Ok(receipt)
}

/// Transfers balance to the user registered under `to_email`.
#[instrument(skip(db, events, note))]
pub async fn transfer_by_email(
    db: &DatabaseConnection,
    events: &EventBus,
    from_user: i64,
    to_email: &str,
    amount: f64,
    note: Option<String>,
) -> Result<TransferReceipt> {
    let recipient = find_user_by_email(db, to_email)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            identifier: to_email.to_string(),
        })?;
    if recipient.id == from_user {
        return Err(Error::InvalidRecipient);
    }
    transfer(db, events, from_user, recipient.id, amount, note).await
}

/// A freshly generated payment link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedLink {
    pub token: String,
    pub link_url: String,
    pub link: payment_link::Model,
}

/// Creates a single-use link that transfers `amount` from `from_user` to whoever
/// redeems it.
///
/// The sender's balance is not reserved; it is checked when the link is redeemed.
#[instrument(skip(db, note, web_url))]
pub async fn generate_payment_link(
    db: &DatabaseConnection,
    from_user: i64,
    amount: f64,
    note: Option<String>,
    web_url: &str,
) -> Result<GeneratedLink> {
    validate_amount(amount)?;
    require_user(db, from_user).await?;

    let token = uuid::Uuid::new_v4().to_string();
    let link = payment_link::ActiveModel {
        token: Set(token.clone()),
        amount: Set(amount),
        from_user: Set(from_user),
        note: Set(note),
        status: Set(LinkStatus::Pending),
        created_at: Set(Utc::now()),
        completed_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let link_url = format!("{}/transfer-balance/{}", web_url.trim_end_matches('/'), token);
    info!("Generated payment link {} for user {}", link.id, from_user);
    Ok(GeneratedLink {
        token,
        link_url,
        link,
    })
}

/// Looks up a payment link by token.
///
/// # Errors
/// Returns [`Error::InvalidOrExpiredLink`] if no link has this token.
pub async fn payment_link_details<C>(db: &C, token: &str) -> Result<payment_link::Model>
where
    C: ConnectionTrait,
{
    PaymentLink::find()
        .filter(payment_link::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or(Error::InvalidOrExpiredLink)
}

/// Redeems a payment link, transferring its amount to `recipient`.
///
/// Consuming the link is a guarded update on `status = pending`; it commits together
/// with the transfer, so a link is consumed at most once and never without its transfer.
///
/// # Errors
/// - [`Error::InvalidOrExpiredLink`] if the token is unknown or already consumed
/// - [`Error::InvalidRecipient`] if the recipient created the link
/// - any error of [`transfer`], in which case the link stays redeemable
#[instrument(skip(db, events, token))]
pub async fn redeem_payment_link(
    db: &DatabaseConnection,
    events: &EventBus,
    token: &str,
    recipient: i64,
) -> Result<TransferReceipt> {
    let txn = db.begin().await?;

    let link = payment_link_details(&txn, token).await?;
    if link.status != LinkStatus::Pending {
        return Err(Error::InvalidOrExpiredLink);
    }
    if link.from_user == recipient {
        return Err(Error::InvalidRecipient);
    }

    let consumed = PaymentLink::update_many()
        .col_expr(
            payment_link::Column::Status,
            Expr::value(LinkStatus::Completed),
        )
        .col_expr(payment_link::Column::CompletedAt, Expr::value(Utc::now()))
        .filter(payment_link::Column::Id.eq(link.id))
        .filter(payment_link::Column::Status.eq(LinkStatus::Pending))
        .exec(&txn)
        .await?;
    if consumed.rows_affected == 0 {
        return Err(Error::InvalidOrExpiredLink);
    }

    let transfer = transfer_in(
        &txn,
        link.from_user,
        recipient,
        link.amount,
        link.note.clone(),
        Some(link.id),
    )
    .await?;
    let receipt = finish_transfer(&txn, transfer).await?;
    txn.commit().await?;

    info!("Payment link {} redeemed by user {}", link.id, recipient);
    announce_transfer(db, events, &receipt).await;
    Ok(receipt)
}

/// Direction of a balance history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Sent,
    Received,
    Topup,
}

/// One line of a user's balance history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub kind: HistoryKind,
    pub amount: f64,
    /// Other side of a transfer; `None` for top-ups
    pub counterparty: Option<i64>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Lists transfers sent and received and approved top-ups, newest first.
pub async fn transfer_history<C>(db: &C, user_id: i64) -> Result<Vec<HistoryEntry>>
where
    C: ConnectionTrait,
{
    let transfers = BalanceTransfer::find()
        .filter(
            balance_transfer::Column::FromUser
                .eq(user_id)
                .or(balance_transfer::Column::ToUser.eq(user_id)),
        )
        .order_by_desc(balance_transfer::Column::CreatedAt)
        .all(db)
        .await?;

    let topups = PaymentTransaction::find()
        .filter(payment_transaction::Column::UserId.eq(user_id))
        .filter(payment_transaction::Column::Kind.eq(PaymentTxKind::Topup))
        .filter(payment_transaction::Column::Status.eq(PaymentTxStatus::Approved))
        .all(db)
        .await?;

    let mut entries: Vec<HistoryEntry> = transfers
        .into_iter()
        .map(|t| {
            let (kind, counterparty) = if t.from_user == user_id {
                (HistoryKind::Sent, t.to_user)
            } else {
                (HistoryKind::Received, t.from_user)
            };
            HistoryEntry {
                kind,
                amount: t.amount,
                counterparty: Some(counterparty),
                note: t.note,
                created_at: t.created_at,
            }
        })
        .chain(topups.into_iter().map(|p| HistoryEntry {
            kind: HistoryKind::Topup,
            amount: p.amount,
            counterparty: None,
            note: None,
            created_at: p.updated_at,
        }))
        .collect();

    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(entries)
}
