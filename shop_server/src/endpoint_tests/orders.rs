use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as j;
use shop_engine::{
    db_types::OrderId,
    test_utils::prepare_env::new_test_database,
    CartManagement,
    InventoryManagement,
    OrderManagement,
};

use super::{
    helpers::{bearer, json, place_order, send, stocked_cart},
    mocks::idle_provider,
};
use crate::auth::Role;

fn order_details() -> serde_json::Value {
    j!({
        "shippingAddress": {"address": "1 Main St", "city": "Springfield", "postalCode": "49007", "country": "USA"},
        "paymentMethod": "Stripe"
    })
}

fn new_order(user: &str, details: serde_json::Value) -> TestRequest {
    TestRequest::post().uri("/api/orders").insert_header(bearer(user, &[Role::User])).set_json(details)
}

#[actix_web::test]
async fn create_order_from_cart() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 2).await;
    let (status, body) = send(&db, idle_provider(), new_order("alice", order_details())).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let summary = json(&body);
    assert_eq!(summary["status"], "AwaitingPayment");
    // 2 x 12.50, 10% tax and flat shipping
    assert_eq!(summary["totalPrice"], 2500 + 250 + 1000);

    let order_id = OrderId::from(summary["orderId"].as_str().unwrap());
    let order = db.fetch_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 2);
    assert!(!order.is_paid);
    // Nothing is taken from stock, or from the cart, until the payment is confirmed
    assert_eq!(db.fetch_product(&"mug".into()).await.unwrap().unwrap().stock, 5);
    assert_eq!(db.fetch_or_create_cart(&"alice".into()).await.unwrap().total_quantity(), 2);
}

#[actix_web::test]
async fn empty_cart_cannot_be_ordered() {
    let db = new_test_database().await;
    let (status, body) = send(&db, idle_provider(), new_order("alice", order_details())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().is_some());
    assert!(db.fetch_all_orders().await.unwrap().is_empty());
}

#[actix_web::test]
async fn incomplete_shipping_address() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let details = j!({"shippingAddress": {"address": "1 Main St"}, "paymentMethod": "Stripe"});
    let (status, body) = send(&db, idle_provider(), new_order("alice", details)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("postalCode"), "{body}");
    let details = j!({"shippingAddress": order_details()["shippingAddress"]});
    let (status, _) = send(&db, idle_provider(), new_order("alice", details)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn stock_is_rechecked_when_ordering() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 4).await;
    db.set_stock(&"mug".into(), 3).await.unwrap();
    let (status, body) = send(&db, idle_provider(), new_order("alice", order_details())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().contains("mug"), "{body}");
}

#[actix_web::test]
async fn users_see_only_their_own_orders() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let order = place_order(&db, "alice").await;
    let path = format!("/api/orders/{}", order.order_id.as_str());

    let req = TestRequest::get().uri(&path).insert_header(bearer("alice", &[Role::User]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = json(&body);
    assert_eq!(fetched["orderId"], order.order_id.as_str());
    assert_eq!(fetched["status"], "AwaitingPayment");

    let req = TestRequest::get().uri(&path).insert_header(bearer("mallory", &[Role::User]));
    let (status, _) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let req = TestRequest::get().uri(&path).insert_header(bearer("root", &[Role::User, Role::Admin]));
    let (status, _) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::get().uri("/api/orders").insert_header(bearer("alice", &[Role::User]));
    let (_, body) = send(&db, idle_provider(), req).await;
    assert_eq!(json(&body).as_array().unwrap().len(), 1);
    let req = TestRequest::get().uri("/api/orders").insert_header(bearer("mallory", &[Role::User]));
    let (_, body) = send(&db, idle_provider(), req).await;
    assert!(json(&body).as_array().unwrap().is_empty());

    let req = TestRequest::get().uri("/api/orders/no-such-order").insert_header(bearer("alice", &[Role::User]));
    let (status, _) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
