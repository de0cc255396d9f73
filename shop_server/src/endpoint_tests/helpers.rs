use actix_web::{body, http::StatusCode, test, test::TestRequest, App};
use chrono::Utc;
use log::debug;
use shop_common::Secret;
use shop_engine::{
    db_types::{Order, Product, UserId},
    events::{EventBroadcaster, EventProducers},
    test_utils::seed::{fill_cart, sample_address, seed_product},
    CartApi,
    OrderFlowApi,
    SqliteDatabase,
};
use stripe_tools::{
    signature::{sign_payload, SIGNATURE_HEADER},
    StripeConfig,
};

use super::mocks::MockProvider;
use crate::{
    auth::{Role, TokenIssuer},
    config::{AuthConfig, ServerConfig},
    integrations::stripe::StripeProvider,
    server::configure_shop,
};

pub const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig::new("endpoint-test-secret-8f1d2c9a7b3e4f5a6b7c8d9e0f1a2b3c")
}

pub fn server_config() -> ServerConfig {
    let stripe = StripeConfig {
        api_base: "http://localhost:12111".to_string(),
        secret_key: Secret::new("sk_test_endpoint".to_string()),
        webhook_secret: Secret::new(WEBHOOK_SECRET.to_string()),
        ..StripeConfig::default()
    };
    ServerConfig { auth: get_auth_config(), stripe, ..ServerConfig::default() }
}

pub fn issue_token(user: &str, roles: &[Role]) -> String {
    let issuer = TokenIssuer::new(&get_auth_config());
    issuer.issue_token(&UserId::from(user), &format!("{user}@example.com"), roles, None).expect("Failed to sign token")
}

pub fn bearer(user: &str, roles: &[Role]) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", issue_token(user, roles)))
}

/// Sends the request to a fully configured shop and returns the status and body. Errors raised by middleware are
/// rendered the same way the server would render them.
pub async fn send(db: &SqliteDatabase, provider: MockProvider, req: TestRequest) -> (StatusCode, String) {
    let config = server_config();
    let verifier = StripeProvider::new(config.stripe.clone()).expect("Failed to create webhook verifier");
    let app = App::new().configure(|cfg| {
        configure_shop(cfg, db.clone(), provider, verifier, EventBroadcaster::new(16), &config);
    });
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1.map_into_boxed_body(),
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let bytes = body::to_bytes(res.into_body()).await.expect("Could not read response body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

/// Seeds a product with `stock` units and puts `quantity` of them in the user's cart.
pub async fn stocked_cart(db: &SqliteDatabase, user: &str, stock: i64, quantity: i64) -> Product {
    let product = seed_product(db, "mug", 1250, stock).await;
    fill_cart(db, &UserId::from(user), &product, quantity).await;
    product
}

/// Places an order for the user's current cart, bypassing the HTTP layer.
pub async fn place_order(db: &SqliteDatabase, user: &str) -> Order {
    let user_id = UserId::from(user);
    let items = CartApi::new(db.clone()).snapshot(&user_id).await.expect("Cart snapshot failed");
    OrderFlowApi::new(db.clone(), EventProducers::default())
        .create_order(&user_id, items, sample_address(), "Stripe")
        .await
        .expect("Order creation failed")
}

pub fn paid_session_event(event_id: &str, order: &Order) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": {"object": {
            "id": "cs_test_1",
            "payment_status": "paid",
            "payment_intent": "pi_test_1",
            "metadata": {"orderId": order.order_id.as_str(), "userId": order.user_id.as_str()}
        }}
    })
    .to_string()
}

pub fn signed_webhook(payload: &str) -> TestRequest {
    let signature = sign_payload(payload.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp()).expect("Signing failed");
    TestRequest::post()
        .uri("/api/payments/webhook")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header(("Content-Type", "application/json"))
        .set_payload(payload.to_string())
}
