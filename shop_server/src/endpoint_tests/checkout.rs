use actix_web::{http::StatusCode, test::TestRequest};
use shop_common::Cents;
use shop_engine::{
    db_types::OrderStatusType,
    payment_objects::{CheckoutRequest, ProviderSession},
    test_utils::prepare_env::new_test_database,
    traits::PaymentProviderError,
    OrderFlowApi,
    OrderManagement,
};

use super::{
    helpers::{bearer, json, place_order, send, stocked_cart},
    mocks::{idle_provider, MockProvider},
};
use crate::auth::Role;

fn checkout(user: &str, order_id: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/payments/create-checkout-session")
        .insert_header(bearer(user, &[Role::User]))
        .set_json(serde_json::json!({"orderId": order_id}))
}

#[actix_web::test]
async fn create_checkout_session() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 2).await;
    let order = place_order(&db, "alice").await;
    let expected_id = order.order_id.clone();
    let mut provider = MockProvider::new();
    provider
        .expect_create_checkout_session()
        .withf(move |req: &CheckoutRequest| {
            req.order_id == expected_id
                && req.user_id.as_str() == "alice"
                && req.line_items.iter().any(|l| l.name == "Tax" && l.unit_amount == Cents::from(250))
                && req.line_items.iter().any(|l| l.name == "Shipping" && l.unit_amount == Cents::from(1000))
                && req.cancel_url.ends_with(&format!("order_id={}", expected_id.as_str()))
        })
        .times(1)
        .returning(|_| {
            Ok(ProviderSession {
                session_id: "cs_test_1".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test_1".to_string()),
                payment_intent_id: None,
            })
        });
    let (status, body) = send(&db, provider, checkout("alice", order.order_id.as_str())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session = json(&body);
    assert_eq!(session["sessionId"], "cs_test_1");
    assert_eq!(session["url"], "https://checkout.stripe.com/c/pay/cs_test_1");

    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.checkout_session_id.as_deref(), Some("cs_test_1"));
    assert_eq!(order.status, OrderStatusType::AwaitingPayment);
}

#[actix_web::test]
async fn only_the_owner_can_pay() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let order = place_order(&db, "alice").await;
    let (status, _) = send(&db, idle_provider(), checkout("mallory", order.order_id.as_str())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&db, idle_provider(), checkout("alice", "no-such-order")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancelled_orders_cannot_be_paid() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let order = place_order(&db, "alice").await;
    OrderFlowApi::new(db.clone(), Default::default())
        .admin_update_status(&order.order_id, OrderStatusType::Cancelled)
        .await
        .unwrap();
    let (status, body) = send(&db, idle_provider(), checkout("alice", order.order_id.as_str())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("Cancelled"), "{body}");
}

#[actix_web::test]
async fn provider_failures_are_reported() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let order = place_order(&db, "alice").await;
    let mut provider = MockProvider::new();
    provider
        .expect_create_checkout_session()
        .times(1)
        .returning(|_| Err(PaymentProviderError::Rejected("Invalid currency".to_string())));
    let (status, body) = send(&db, provider, checkout("alice", order.order_id.as_str())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json(&body)["error"].as_str().unwrap().contains("Invalid currency"), "{body}");
    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.checkout_session_id, None);
}
