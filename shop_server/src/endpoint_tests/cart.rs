use actix_web::{http::StatusCode, test::TestRequest};
use serde_json::json as j;
use shop_engine::{
    test_utils::{prepare_env::new_test_database, seed::seed_product},
    CartManagement,
};

use super::{
    helpers::{bearer, json, send},
    mocks::idle_provider,
};
use crate::auth::Role;

fn add_item(product_id: &str, quantity: i64) -> TestRequest {
    TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer("alice", &[Role::User]))
        .set_json(j!({"productId": product_id, "quantity": quantity}))
}

#[actix_web::test]
async fn add_and_remove_cart_items() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 5).await;
    seed_product(&db, "tee", 2000, 1).await;

    let (status, body) = send(&db, idle_provider(), add_item("mug", 2)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (_, body) = send(&db, idle_provider(), add_item("mug", 1)).await;
    let cart = json(&body);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["productId"], "mug");
    assert_eq!(cart["items"][0]["quantity"], 3);
    assert_eq!(cart["items"][0]["price"], 1250);

    send(&db, idle_provider(), add_item("tee", 1)).await;
    let req = TestRequest::delete().uri("/api/cart/items/mug").insert_header(bearer("alice", &[Role::User]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);
    let cart = json(&body);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["productId"], "tee");

    let req = TestRequest::get().uri("/api/cart").insert_header(bearer("bob", &[Role::User]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json(&body)["items"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn cart_cannot_exceed_stock() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 2).await;
    let (status, _) = send(&db, idle_provider(), add_item("mug", 2)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&db, idle_provider(), add_item("mug", 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().is_some());
    let cart = db.fetch_or_create_cart(&"alice".into()).await.unwrap();
    assert_eq!(cart.total_quantity(), 2);
}

#[actix_web::test]
async fn bad_cart_requests() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 2).await;
    let (status, _) = send(&db, idle_provider(), add_item("teapot", 1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&db, idle_provider(), add_item("mug", 0)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let req = TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer("alice", &[Role::User]))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json");
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json(&body)["error"].as_str().unwrap().starts_with("Could not read request body"));
}

#[actix_web::test]
async fn clear_cart() {
    let db = new_test_database().await;
    seed_product(&db, "mug", 1250, 5).await;
    send(&db, idle_provider(), add_item("mug", 2)).await;
    let req = TestRequest::delete().uri("/api/cart").insert_header(bearer("alice", &[Role::User]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["success"], true);
    assert!(db.fetch_or_create_cart(&"alice".into()).await.unwrap().is_empty());
}
