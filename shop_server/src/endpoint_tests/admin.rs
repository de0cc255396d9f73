use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as j;
use shop_engine::{
    db_types::{Order, OrderStatusType},
    test_utils::{prepare_env::new_test_database, seed::seed_product},
    InventoryManagement,
    OrderManagement,
    SqliteDatabase,
};

use super::{
    helpers::{bearer, json, paid_session_event, place_order, send, signed_webhook, stocked_cart},
    mocks::idle_provider,
};
use crate::auth::Role;

fn admin() -> (&'static str, String) {
    bearer("root", &[Role::User, Role::Admin])
}

fn set_status(order: &Order, status: &str) -> TestRequest {
    TestRequest::put()
        .uri(&format!("/api/orders/{}/status", order.order_id.as_str()))
        .insert_header(admin())
        .set_json(j!({ "status": status }))
}

async fn paid_order(db: &SqliteDatabase) -> Order {
    stocked_cart(db, "alice", 5, 1).await;
    let order = place_order(db, "alice").await;
    let (code, _) = send(db, idle_provider(), signed_webhook(&paid_session_event("evt_1", &order))).await;
    assert_eq!(code, StatusCode::OK);
    order
}

#[actix_web::test]
async fn ship_and_deliver() {
    let db = new_test_database().await;
    let order = paid_order(&db).await;
    let (code, body) = send(&db, idle_provider(), set_status(&order, "shipped")).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["status"], "Shipped");
    let (code, body) = send(&db, idle_provider(), set_status(&order, "Delivered")).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    let delivered = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(delivered.status, OrderStatusType::Delivered);
    assert!(delivered.is_delivered);
    assert!(delivered.shipped_at.is_some());
}

#[actix_web::test]
async fn illegal_status_changes() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 5, 1).await;
    let order = place_order(&db, "alice").await;
    // Unpaid orders cannot be shipped
    let (code, _) = send(&db, idle_provider(), set_status(&order, "Shipped")).await;
    assert_eq!(code, StatusCode::CONFLICT);
    // Processing is reserved for the payment provider
    let (code, _) = send(&db, idle_provider(), set_status(&order, "Processing")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let (code, _) = send(&db, idle_provider(), set_status(&order, "teleported")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let (code, _) = send(&db, idle_provider(), set_status(&order, "Cancelled")).await;
    assert_eq!(code, StatusCode::OK);
    let (code, _) = send(&db, idle_provider(), set_status(&order, "Cancelled")).await;
    assert_eq!(code, StatusCode::CONFLICT);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatusType::Cancelled);

    let req = TestRequest::put()
        .uri("/api/orders/no-such-order/status")
        .insert_header(admin())
        .set_json(j!({"status": "Shipped"}));
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn customers_cannot_change_status() {
    let db = new_test_database().await;
    let order = paid_order(&db).await;
    let req = TestRequest::put()
        .uri(&format!("/api/orders/{}/status", order.order_id.as_str()))
        .insert_header(bearer("alice", &[Role::User]))
        .set_json(j!({"status": "Delivered"}));
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert_eq!(db.fetch_order(&order.order_id).await.unwrap().unwrap().status, OrderStatusType::Processing);
}

#[actix_web::test]
async fn all_orders_newest_first() {
    let db = new_test_database().await;
    stocked_cart(&db, "alice", 10, 1).await;
    let first = place_order(&db, "alice").await;
    let second = place_order(&db, "alice").await;
    let req = TestRequest::get().uri("/api/admin/orders").insert_header(admin());
    let (code, body) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::OK);
    let orders = json(&body);
    let ids = orders.as_array().unwrap().iter().map(|o| o["orderId"].as_str().unwrap().to_string()).collect::<Vec<_>>();
    assert_eq!(ids, vec![second.order_id.as_str().to_string(), first.order_id.as_str().to_string()]);
}

#[actix_web::test]
async fn manage_stock() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 5).await;
    let req =
        TestRequest::put().uri("/api/admin/products/mug/stock").insert_header(admin()).set_json(j!({"stock": 42}));
    let (code, body) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    assert_eq!(json(&body), j!({"productId": "mug", "stock": 42}));
    assert_eq!(db.fetch_product(&"mug".into()).await.unwrap().unwrap().stock, 42);

    let req =
        TestRequest::put().uri("/api/admin/products/mug/stock").insert_header(admin()).set_json(j!({"stock": -1}));
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let req =
        TestRequest::put().uri("/api/admin/products/teapot/stock").insert_header(admin()).set_json(j!({"stock": 1}));
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn retire_product() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 5).await;
    let req = TestRequest::delete().uri("/api/admin/products/mug").insert_header(admin());
    let (code, body) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["success"], true);
    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer("alice", &[Role::User]))
        .set_json(j!({"productId": "mug"}));
    let (code, _) = send(&db, idle_provider(), req).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert_eq!(db.fetch_product(&"mug".into()).await.unwrap().unwrap().stock, 0);
}
