use super::{
    AppState,
    extract::{ApiJson, ApiPath},
};
use crate::{
    core::table::{self, TableOverview},
    entities::{TableNotificationKind, TableNotificationModel, TableSessionModel},
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
pub struct ServiceRequest {
    pub kind: TableNotificationKind,
}

#[derive(Debug, Serialize)]
pub struct CloseResponse {
    /// The session that was closed, if one was active
    pub session: Option<TableSessionModel>,
}

pub(crate) async fn table_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<TableOverview>> {
    let overview = table::table_status(&state.database, id).await?;
    Ok(Json(overview))
}

pub(crate) async fn close_table(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CloseResponse>> {
    let session = table::close_session(&state.database, &state.events, id).await?;
    Ok(Json(CloseResponse { session }))
}

pub(crate) async fn request_service(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ServiceRequest>,
) -> Result<(StatusCode, Json<TableNotificationModel>)> {
    let request = table::request_service(&state.database, id, req.kind).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
