use actix_web::{http::StatusCode, test, test::TestRequest, App};
use shop_engine::{events::EventBroadcaster, test_utils::prepare_env::new_test_database};

use super::{
    helpers::{bearer, json, send, server_config},
    mocks::idle_provider,
};
use crate::{
    auth::{Role, TokenIssuer},
    config::AuthConfig,
    integrations::stripe::StripeProvider,
    server::configure_shop,
    sse::SSE_CONTENT_TYPE,
};

#[actix_web::test]
async fn health_check() {
    let db = new_test_database().await;
    let (status, body) = send(&db, idle_provider(), TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn api_requires_a_token() {
    let db = new_test_database().await;
    let (status, body) = send(&db, idle_provider(), TestRequest::get().uri("/api/cart")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].as_str().unwrap().contains("No bearer token"), "{body}");
}

#[actix_web::test]
async fn tokens_signed_elsewhere_are_rejected() {
    let db = new_test_database().await;
    let forged = TokenIssuer::new(&AuthConfig::new("some-other-secret"))
        .issue_token(&"alice".into(), "alice@example.com", &[Role::User, Role::Admin], None)
        .unwrap();
    let req = TestRequest::get().uri("/api/admin/orders").insert_header(("Authorization", format!("Bearer {forged}")));
    let (status, _) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn admin_routes_need_the_admin_role() {
    let db = new_test_database().await;
    let req = TestRequest::get().uri("/api/admin/orders").insert_header(bearer("alice", &[Role::User]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json(&body)["error"].as_str().is_some());

    let req = TestRequest::put()
        .uri("/api/admin/products/mug/stock")
        .insert_header(bearer("alice", &[Role::User]))
        .set_json(serde_json::json!({"stock": 100}));
    let (status, _) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let req = TestRequest::get().uri("/api/admin/orders").insert_header(bearer("root", &[Role::User, Role::Admin]));
    let (status, body) = send(&db, idle_provider(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body), serde_json::json!([]));
}

#[actix_web::test]
async fn event_stream_is_public() {
    let db = new_test_database().await;
    let config = server_config();
    let verifier = StripeProvider::new(config.stripe.clone()).unwrap();
    let app = App::new().configure(|cfg| {
        configure_shop(cfg, db.clone(), idle_provider(), verifier, EventBroadcaster::new(16), &config);
    });
    let service = test::init_service(app).await;
    let res = test::call_service(&service, TestRequest::get().uri("/events").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("Content-Type").unwrap(), SSE_CONTENT_TYPE);
    assert_eq!(res.headers().get("Cache-Control").unwrap(), "no-cache");
}
