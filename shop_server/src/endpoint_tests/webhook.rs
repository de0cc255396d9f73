use actix_web::{http::StatusCode, test::TestRequest};
use chrono::Utc;
use shop_engine::{
    db_types::{Order, OrderStatusType},
    test_utils::prepare_env::new_test_database,
    CartManagement,
    InventoryManagement,
    OrderManagement,
    SqliteDatabase,
};
use stripe_tools::signature::{sign_payload, SIGNATURE_HEADER};

use super::{
    helpers::{json, paid_session_event, place_order, send, signed_webhook, stocked_cart},
    mocks::idle_provider,
};

async fn awaiting_order(db: &SqliteDatabase) -> Order {
    stocked_cart(db, "alice", 5, 2).await;
    place_order(db, "alice").await
}

async fn stock(db: &SqliteDatabase) -> i64 {
    db.fetch_product(&"mug".into()).await.unwrap().unwrap().stock
}

async fn status(db: &SqliteDatabase, order: &Order) -> OrderStatusType {
    db.fetch_order(&order.order_id).await.unwrap().unwrap().status
}

#[actix_web::test]
async fn paid_checkout_completes_the_order() {
    let db = new_test_database().await;
    let order = awaiting_order(&db).await;
    let (code, body) = send(&db, idle_provider(), signed_webhook(&paid_session_event("evt_1", &order))).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    assert_eq!(json(&body), serde_json::json!({"received": true}));

    let paid = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(paid.status, OrderStatusType::Processing);
    assert!(paid.is_paid);
    assert!(paid.paid_at.is_some());
    assert_eq!(paid.payment_intent_id.as_deref(), Some("pi_test_1"));
    assert_eq!(stock(&db).await, 3);
    assert!(db.fetch_or_create_cart(&"alice".into()).await.unwrap().is_empty());
}

#[actix_web::test]
async fn redelivered_events_are_applied_once() {
    let db = new_test_database().await;
    let order = awaiting_order(&db).await;
    let payload = paid_session_event("evt_1", &order);
    let (code, _) = send(&db, idle_provider(), signed_webhook(&payload)).await;
    assert_eq!(code, StatusCode::OK);
    let paid_at = db.fetch_order(&order.order_id).await.unwrap().unwrap().paid_at;
    assert!(paid_at.is_some());
    for _ in 0..2 {
        let (code, _) = send(&db, idle_provider(), signed_webhook(&payload)).await;
        assert_eq!(code, StatusCode::OK);
    }
    // A different event for the same payment must not take stock a second time either
    let (code, _) = send(&db, idle_provider(), signed_webhook(&paid_session_event("evt_2", &order))).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(status(&db, &order).await, OrderStatusType::Processing);
    assert_eq!(stock(&db).await, 3);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().paid_at, paid_at);
}

#[actix_web::test]
async fn forged_webhooks_are_rejected() {
    let db = new_test_database().await;
    let order = awaiting_order(&db).await;
    let payload = paid_session_event("evt_1", &order);
    let forged = sign_payload(payload.as_bytes(), "whsec_forged", Utc::now().timestamp()).unwrap();
    let req = TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header((SIGNATURE_HEADER, forged))
        .set_payload(payload.clone());
    let (code, body) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().is_some());

    let req = TestRequest::post().uri("/api/payments/webhook").set_payload(payload);
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    assert_eq!(status(&db, &order).await, OrderStatusType::AwaitingPayment);
    assert_eq!(stock(&db).await, 5);
}

#[actix_web::test]
async fn failed_payment() {
    let db = new_test_database().await;
    let order = awaiting_order(&db).await;
    let payload = serde_json::json!({
        "id": "evt_fail",
        "type": "payment_intent.payment_failed",
        "data": {"object": {"id": "pi_test_1", "metadata": {"orderId": order.order_id.as_str(), "userId": "alice"}}}
    })
    .to_string();
    let (code, _) = send(&db, idle_provider(), signed_webhook(&payload)).await;
    assert_eq!(code, StatusCode::OK);
    let failed = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(failed.status, OrderStatusType::Failed);
    assert!(!failed.is_paid);
    assert_eq!(stock(&db).await, 5);
    // A late success for a failed order changes nothing
    let (code, _) = send(&db, idle_provider(), signed_webhook(&paid_session_event("evt_late", &order))).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(status(&db, &order).await, OrderStatusType::Failed);
    assert_eq!(stock(&db).await, 5);
}

#[actix_web::test]
async fn events_without_effect_are_acknowledged() {
    let db = new_test_database().await;
    let order = awaiting_order(&db).await;
    let payloads = [
        r#"{"id":"evt_a","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#.to_string(),
        r#"{"id":"evt_b","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid"}}}"#
            .to_string(),
        serde_json::json!({
            "id": "evt_c",
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "payment_status": "paid", "metadata": {"orderId": "no-such-order"}}}
        })
        .to_string(),
    ];
    for payload in payloads {
        let (code, body) = send(&db, idle_provider(), signed_webhook(&payload)).await;
        assert_eq!(code, StatusCode::OK, "{payload}: {body}");
    }
    assert_eq!(status(&db, &order).await, OrderStatusType::AwaitingPayment);
    assert_eq!(stock(&db).await, 5);
}
