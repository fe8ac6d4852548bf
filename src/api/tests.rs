#![allow(clippy::unwrap_used)]
#![allow(clippy::float_cmp)]

use super::*;
use crate::{
    core::{events::DomainEvent, user},
    entities::{OrderStatus, PaymentMethod, PaymentTransaction, payment_transaction},
    errors::Result,
    test_utils::*,
};
use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn test_state(gateway: Option<FakeGateway>) -> Result<Arc<AppState>> {
    let database = setup_test_db().await?;
    Ok(Arc::new(AppState {
        database,
        events: EventBus::default(),
        policy: OrderPolicy::default(),
        payments: PaymentsConfig::default(),
        gateway: gateway.map(|g| Arc::new(g) as Arc<dyn PaymentGateway>),
    }))
}

async fn call(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Bytes) {
    let resp = build_router(Arc::clone(state)).oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = call(state, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post(state: &Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = call(state, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let state = test_state(None).await?;
    let (status, body) = get(&state, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "barflow");
    Ok(())
}

#[tokio::test]
async fn test_order_create_then_cancel_over_http() -> Result<()> {
    let state = test_state(None).await?;
    let db = &state.database;
    let ana = create_test_user(db, "Ana", 150.0).await?;
    let product = create_test_product(db, "Picada", 100.0, 20).await?;

    let (status, created) = post(
        &state,
        "/api/orders",
        json!({
            "user_id": ana.id,
            "items": [{ "product_id": product.id, "quantity": 1 }],
            "total_amount": 100.0,
            "payment_method": "balance"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order"]["status"], "pending");
    assert_eq!(created["view"]["cancellable"], true);
    let order_id = created["order"]["id"].as_i64().unwrap();

    let (status, cancelled) =
        post(&state, &format!("/api/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["order"]["status"], "cancelled");
    assert_eq!(cancelled["refunded"], 100.0);

    let (status, again) =
        post(&state, &format!("/api/orders/{order_id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["kind"], "not_cancellable");

    let (_, listed) = get(&state, &format!("/api/orders?user_id={}", ana.id)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["view"]["display_status"], "cancelled");

    let balance = user::require_user(db, ana.id).await?.balance;
    assert_eq!(balance, 150.0);
    Ok(())
}

#[tokio::test]
async fn test_business_errors_map_to_status_codes() -> Result<()> {
    let state = test_state(None).await?;
    let db = &state.database;
    let ana = create_test_user(db, "Ana", 10.0).await?;
    let product = create_test_product(db, "Picada", 100.0, 20).await?;

    let (status, body) = post(
        &state,
        "/api/orders",
        json!({
            "user_id": ana.id,
            "items": [{ "product_id": product.id, "quantity": 1 }],
            "total_amount": 100.0,
            "payment_method": "balance"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficient_balance");
    assert_eq!(body["code"], 400);

    let (status, body) = get(&state, "/api/orders/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "order_not_found");

    let order = insert_test_order(db, ana.id, None, 10.0, PaymentMethod::Cash).await?;
    let order = force_order_status(db, order, OrderStatus::Preparing).await?;
    let (status, body) =
        post(&state, &format!("/api/orders/{}/cancel", order.id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "not_cancellable");

    let (status, body) = post(
        &state,
        &format!("/api/orders/{}/status", order.id),
        json!({ "status": "delivered" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");
    Ok(())
}

#[tokio::test]
async fn test_malformed_input_is_validation_error() -> Result<()> {
    let state = test_state(None).await?;

    let (status, body) = post(&state, "/api/orders", json!({ "user_id": 1, "items": "oops" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    assert_eq!(body["code"], 400);

    let req = Request::builder()
        .method("POST")
        .uri("/api/transfers")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = call(&state, req).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = get(&state, "/api/orders/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = get(&state, "/api/orders?user_id=ana").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
    Ok(())
}

#[tokio::test]
async fn test_transfer_and_payment_link_over_http() -> Result<()> {
    let state = test_state(None).await?;
    let db = &state.database;
    let ana = create_test_user(db, "Ana", 100.0).await?;
    let bruno = create_test_user(db, "Bruno", 0.0).await?;

    let (status, receipt) = post(
        &state,
        "/api/transfers",
        json!({ "from_user": ana.id, "to_email": bruno.email, "amount": 30.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["sender_balance"], 70.0);

    let (status, body) = post(
        &state,
        "/api/transfers",
        json!({ "from_user": ana.id, "to_email": ana.email, "amount": 1.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_recipient");

    let (status, link) = post(
        &state,
        "/api/payment-links",
        json!({ "from_user": ana.id, "amount": 20.0, "note": "cena" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = link["token"].as_str().unwrap().to_string();
    assert!(link["link_url"].as_str().unwrap().ends_with(&token));

    let (status, details) = get(&state, &format!("/api/payment-links/{token}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["status"], "pending");

    let redeem_uri = format!("/api/payment-links/{token}/redeem");
    let (status, redeemed) = post(&state, &redeem_uri, json!({ "recipient_id": bruno.id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redeemed["success"], true);
    assert_eq!(redeemed["receipt"]["recipient_balance"], 50.0);

    let (status, body) = post(&state, &redeem_uri, json!({ "recipient_id": bruno.id })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_or_expired_link");

    let (_, history) = get(&state, &format!("/api/transfers?user_id={}", bruno.id)).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_webhook_applies_topup_once() -> Result<()> {
    let gateway = FakeGateway::default();
    let state = test_state(Some(gateway.clone())).await?;
    let ana = create_test_user(&state.database, "Ana", 0.0).await?;

    let (status, topup) =
        post(&state, "/api/topups", json!({ "user_id": ana.id, "amount": 200.0 })).await;
    assert_eq!(status, StatusCode::CREATED);
    let tx_id = topup["id"].as_i64().unwrap();

    // The state holds a handle on the same gateway
    gateway.register("555", "approved", tx_id);

    let payload = json!({ "action": "payment.updated", "type": "payment", "data": { "id": 555 } });
    let (status, body) = post(&state, "/api/payments/webhook", payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (_, body) = post(&state, "/api/payments/webhook", payload).await;
    assert_eq!(body["outcome"], "already_processed");

    let tx = PaymentTransaction::find()
        .filter(payment_transaction::Column::Id.eq(tx_id))
        .one(&state.database)
        .await?
        .unwrap();
    assert_eq!(tx.external_payment_id.as_deref(), Some("555"));
    assert_eq!(user::require_user(&state.database, ana.id).await?.balance, 200.0);
    Ok(())
}

#[tokio::test]
async fn test_webhook_without_gateway_is_bad_gateway() -> Result<()> {
    let state = test_state(None).await?;
    let (status, body) = post(
        &state,
        "/api/payments/webhook",
        json!({ "action": "payment.updated", "data": { "id": "1" } }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "external_service_error");
    Ok(())
}

#[tokio::test]
async fn test_table_routes() -> Result<()> {
    let state = test_state(None).await?;
    let db = &state.database;
    let ana = create_test_user(db, "Ana", 100.0).await?;
    let product = create_test_product(db, "Pizza", 40.0, 20).await?;
    let dining = create_test_table(db, "5").await?;
    user::assign_table(db, ana.id, Some(dining.id)).await?;

    let mut rx = state.events.subscribe();
    let (status, _) = post(
        &state,
        "/api/orders",
        json!({
            "user_id": ana.id,
            "items": [{ "product_id": product.id, "quantity": 1 }],
            "total_amount": 40.0,
            "payment_method": "cash"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(matches!(
        rx.recv().await.unwrap(),
        DomainEvent::OrderCreated { table_id: Some(id), .. } if id == dining.id
    ));

    let (status, overview) = get(&state, &format!("/api/tables/{}", dining.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["session"]["total_spent"], 40.0);
    assert_eq!(overview["table"]["status"], "occupied");

    let (status, request) = post(
        &state,
        &format!("/api/tables/{}/requests", dining.id),
        json!({ "kind": "bill_request" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["kind"], "bill_request");

    let (status, closed) =
        post(&state, &format!("/api/tables/{}/close", dining.id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["session"]["status"], "closed");

    let (status, body) = get(&state, "/api/tables/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "table_not_found");
    Ok(())
}

#[tokio::test]
async fn test_menu_and_gift_routes() -> Result<()> {
    let state = test_state(None).await?;
    let db = &state.database;
    let ana = create_test_user(db, "Ana", 0.0).await?;
    let bruno = create_test_user(db, "Bruno", 0.0).await?;
    let product = create_test_product(db, "Cerveza", 30.0, 10).await?;

    let (status, products) = get(&state, "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products[0]["name"], "Cerveza");

    let (status, _) = get(&state, "/api/products/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let gift =
        crate::core::gift::send_gift(db, ana.id, bruno.id, product.id, 1, None).await?;
    let (_, gifts) = get(&state, &format!("/api/gifts?user_id={}", bruno.id)).await;
    assert_eq!(gifts[0]["id"], gift.id);

    let uri = format!("/api/gifts/{}/redeem", gift.id);
    let (status, redeemed) = post(&state, &uri, json!({ "user_id": bruno.id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redeemed["status"], "redeemed");

    let (status, _) = post(&state, &uri, json!({ "user_id": bruno.id })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}
