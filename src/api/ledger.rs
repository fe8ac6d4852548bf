use super::{
    AppState, UserQuery,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::ledger::{self, GeneratedLink, HistoryEntry, TransferReceipt},
    entities::PaymentLinkModel,
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from_user: i64,
    /// Email of the recipient
    pub to_email: String,
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub from_user: i64,
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub recipient_id: i64,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub receipt: TransferReceipt,
}

pub(crate) async fn transfer(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> Result<(StatusCode, Json<TransferReceipt>)> {
    let receipt = ledger::transfer_by_email(
        &state.database,
        &state.events,
        req.from_user,
        &req.to_email,
        req.amount,
        req.note,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub(crate) async fn history(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let entries = ledger::transfer_history(&state.database, query.user_id).await?;
    Ok(Json(entries))
}

pub(crate) async fn generate_link(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LinkRequest>,
) -> Result<(StatusCode, Json<GeneratedLink>)> {
    let link = ledger::generate_payment_link(
        &state.database,
        req.from_user,
        req.amount,
        req.note,
        &state.payments.web_url,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub(crate) async fn link_details(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<PaymentLinkModel>> {
    let link = ledger::payment_link_details(&state.database, &token).await?;
    Ok(Json(link))
}

pub(crate) async fn redeem_link(
    State(state): State<Arc<AppState>>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<RedeemRequest>,
) -> Result<Json<RedeemResponse>> {
    let receipt =
        ledger::redeem_payment_link(&state.database, &state.events, &token, req.recipient_id)
            .await?;
    Ok(Json(RedeemResponse {
        success: true,
        receipt,
    }))
}
