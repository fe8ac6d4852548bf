use super::{
    AppState, UserQuery,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{gift, notification, product},
    entities::{GiftModel, NotificationModel, ProductModel},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct RedeemGiftRequest {
    pub user_id: i64,
}

pub(crate) async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductModel>>> {
    let products = product::list_products(&state.database).await?;
    Ok(Json(products))
}

pub(crate) async fn get_product(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductModel>> {
    product::get_product(&state.database, id)
        .await?
        .filter(|p| !p.is_deleted)
        .map(Json)
        .ok_or(Error::ProductNotFound { id })
}

pub(crate) async fn list_gifts(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<GiftModel>>> {
    let gifts = gift::list_gifts(&state.database, query.user_id).await?;
    Ok(Json(gifts))
}

pub(crate) async fn redeem_gift(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RedeemGiftRequest>,
) -> Result<Json<GiftModel>> {
    let redeemed = gift::redeem_gift(&state.database, &state.events, id, req.user_id).await?;
    Ok(Json(redeemed))
}

pub(crate) async fn list_notifications(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<NotificationModel>>> {
    let notifications = notification::list_for_user(&state.database, query.user_id).await?;
    Ok(Json(notifications))
}
