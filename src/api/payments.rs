use super::{AppState, extract::ApiJson};
use crate::{
    core::payment::{self, WebhookOutcome},
    entities::PaymentTransactionModel,
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct TopupRequest {
    pub user_id: i64,
    pub amount: f64,
}

/// Notification body posted by the gateway
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    /// e.g. `payment.updated`
    #[serde(default)]
    pub action: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    /// Gateway payment id; sent as a string or a number
    pub id: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub outcome: WebhookOutcome,
}

pub(crate) async fn create_topup(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TopupRequest>,
) -> Result<(StatusCode, Json<PaymentTransactionModel>)> {
    let tx = payment::create_topup(&state.database, req.user_id, req.amount).await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

pub(crate) async fn webhook(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<WebhookPayload>,
) -> Result<Json<WebhookResponse>> {
    debug!("Payment webhook received: {:?}", payload);

    let event_type = payload.action.or(payload.kind).unwrap_or_default();
    let Some(payment_id) = payload.data.map(|data| match data.id {
        serde_json::Value::String(id) => id,
        other => other.to_string(),
    }) else {
        return Ok(Json(WebhookResponse {
            outcome: WebhookOutcome::Ignored,
        }));
    };

    let gateway = state
        .gateway
        .as_deref()
        .ok_or_else(|| Error::ExternalService {
            message: "payment gateway is not configured".to_string(),
        })?;

    let outcome = payment::handle_payment_event(
        &state.database,
        &state.events,
        gateway,
        &event_type,
        &payment_id,
    )
    .await?;
    Ok(Json(WebhookResponse { outcome }))
}
