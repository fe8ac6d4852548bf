use super::{
    AppState, UserQuery,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use crate::{
    core::{
        order::{self, CancelledOrder, NewOrder, OrderWithItems},
        status::{self, OrderView},
    },
    entities::{OrderStatus, order_item},
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An order as returned to clients, with its display state at response time
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: crate::entities::OrderModel,
    pub items: Vec<order_item::Model>,
    pub view: OrderView,
}

impl OrderResponse {
    fn new(state: &AppState, found: OrderWithItems) -> Self {
        let view = status::describe(&found.order, Utc::now(), &state.policy);
        Self {
            order: found.order,
            items: found.items,
            view,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

pub(crate) async fn create_order(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<NewOrder>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    let created = order::create_order(&state.database, &state.events, &state.policy, req).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::new(&state, created))))
}

pub(crate) async fn list_orders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Vec<OrderResponse>>> {
    let orders = order::list_orders_for_user(&state.database, query.user_id).await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|found| OrderResponse::new(&state, found))
            .collect(),
    ))
}

pub(crate) async fn get_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<OrderResponse>> {
    let found = order::get_order(&state.database, id).await?;
    Ok(Json(OrderResponse::new(&state, found)))
}

pub(crate) async fn cancel_order(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CancelledOrder>> {
    let cancelled = order::cancel_order(&state.database, &state.events, &state.policy, id).await?;
    Ok(Json(cancelled))
}

pub(crate) async fn advance_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<crate::entities::OrderModel>> {
    let updated = order::advance_order_status(&state.database, &state.events, id, req.status).await?;
    Ok(Json(updated))
}
