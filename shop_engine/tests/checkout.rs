use std::time::Duration;

use mockall::mock;
use shop_common::Cents;
use shop_engine::{
    db_types::{LineItem, Order, OrderStatusType, UserId},
    payment_objects::{CheckoutRequest, ProviderSession},
    shop_api::checkout_api::CheckoutConfig,
    traits::PaymentProviderError,
    CheckoutApi,
    OrderFlowApi,
    PaymentProvider,
    ShopError,
    SqliteDatabase,
};

mod support;
use support::{sample_address, setup, tear_down, TestShop};

mock! {
    pub Provider {}
    impl PaymentProvider for Provider {
        async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<ProviderSession, PaymentProviderError>;
    }
}

/// A provider that never answers in time.
struct SlowProvider;

impl PaymentProvider for SlowProvider {
    async fn create_checkout_session(&self, _request: CheckoutRequest) -> Result<ProviderSession, PaymentProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(PaymentProviderError::Transport("unreachable".to_string()))
    }
}

fn session(id: &str) -> ProviderSession {
    ProviderSession {
        session_id: id.to_string(),
        url: Some(format!("https://checkout.example.com/pay/{id}")),
        payment_intent_id: None,
    }
}

fn config() -> CheckoutConfig {
    CheckoutConfig { frontend_url: "https://shop.example.com/".to_string(), ..CheckoutConfig::default() }
}

async fn new_order(shop: &TestShop) -> Order {
    let api = OrderFlowApi::new(shop.db.clone(), shop.producers());
    let items = vec![
        LineItem {
            product_id: "mug".into(),
            name: "Mug".to_string(),
            image: Some("/images/mug.jpg".to_string()),
            quantity: 2,
            unit_price: Cents::from(1250),
        },
        LineItem { product_id: "pen".into(), name: "Pen".to_string(), image: None, quantity: 1, unit_price: Cents::from(199) },
    ];
    api.create_order(&"alice".into(), items, sample_address(), "Stripe").await.expect("Error creating order")
}

fn checkout(shop: &TestShop, provider: MockProvider) -> CheckoutApi<SqliteDatabase, MockProvider> {
    CheckoutApi::new(shop.db.clone(), provider, config())
}

#[tokio::test]
async fn session_is_built_from_frozen_order() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let expected_total = order.total_price;
    let order_id = order.order_id.clone();
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().times(1).returning(move |req| {
        assert_eq!(req.order_id, order_id);
        assert_eq!(req.user_id, UserId::from("alice"));
        assert_eq!(req.currency, "usd");
        let names = req.line_items.iter().map(|l| l.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Mug", "Pen", "Tax", "Shipping"]);
        assert_eq!(req.line_items[0].unit_amount, Cents::from(1250));
        assert_eq!(req.line_items[0].quantity, 2);
        assert_eq!(req.total(), expected_total);
        assert_eq!(req.success_url, "https://shop.example.com/order-success.html?session_id={CHECKOUT_SESSION_ID}");
        assert_eq!(req.cancel_url, format!("https://shop.example.com/order-cancelled.html?order_id={}", order_id.as_str()));
        Ok(session("cs_test_1"))
    });
    let api = checkout(&shop, provider);
    let result = api.create_session(&order).await.expect("Error creating session");
    assert_eq!(result.session_id, "cs_test_1");
    assert_eq!(result.redirect_url.as_deref(), Some("https://checkout.example.com/pay/cs_test_1"));
    assert_eq!(result.order.checkout_session_id.as_deref(), Some("cs_test_1"));
    assert_eq!(result.order.status, OrderStatusType::AwaitingPayment);
    tear_down(shop).await;
}

#[tokio::test]
async fn new_session_supersedes_old_one() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let mut provider = MockProvider::new();
    let mut n = 0;
    provider.expect_create_checkout_session().times(2).returning(move |_| {
        n += 1;
        Ok(session(&format!("cs_test_{n}")))
    });
    let api = checkout(&shop, provider);
    let first = api.create_session(&order).await.unwrap();
    let second = api.create_session(&first.order).await.unwrap();
    assert_eq!(second.session_id, "cs_test_2");
    assert_eq!(second.order.checkout_session_id.as_deref(), Some("cs_test_2"));
    tear_down(shop).await;
}

#[tokio::test]
async fn only_pending_orders_are_payable() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let flow = OrderFlowApi::new(shop.db.clone(), shop.producers());
    let cancelled = flow.cancel(&order.order_id).await.unwrap();
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().never();
    let api = checkout(&shop, provider);
    let err = api.create_session(&cancelled).await.unwrap_err();
    assert!(matches!(err, ShopError::OrderNotPayable(_, OrderStatusType::Cancelled)));
    // A stale copy of the order is caught when the session is saved
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().times(1).returning(|_| Ok(session("cs_late")));
    let api = checkout(&shop, provider);
    let err = api.create_session(&order).await.unwrap_err();
    assert!(matches!(err, ShopError::OrderNotPayable(_, OrderStatusType::Cancelled)));
    let stored = flow.fetch_order(&order.order_id).await.unwrap();
    assert!(stored.checkout_session_id.is_none());
    tear_down(shop).await;
}

#[tokio::test]
async fn provider_failures_leave_order_untouched() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let mut provider = MockProvider::new();
    provider
        .expect_create_checkout_session()
        .returning(|_| Err(PaymentProviderError::Rejected("Invalid API key".to_string())));
    let api = checkout(&shop, provider);
    let err = api.create_session(&order).await.unwrap_err();
    assert!(matches!(err, ShopError::PaymentProviderError(ref msg) if msg.contains("Invalid API key")));
    let flow = OrderFlowApi::new(shop.db.clone(), shop.producers());
    let stored = flow.fetch_order(&order.order_id).await.unwrap();
    assert!(stored.checkout_session_id.is_none());
    assert_eq!(stored.status, OrderStatusType::AwaitingPayment);
    tear_down(shop).await;
}

#[tokio::test]
async fn slow_provider_times_out() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let config = CheckoutConfig { timeout: Duration::from_millis(50), ..config() };
    let api = CheckoutApi::new(shop.db.clone(), SlowProvider, config);
    let err = api.create_session(&order).await.unwrap_err();
    assert!(matches!(err, ShopError::PaymentProviderError(_)));
    tear_down(shop).await;
}

#[tokio::test]
async fn only_the_owner_can_pay() {
    let shop = setup().await;
    let order = new_order(&shop).await;
    let mut provider = MockProvider::new();
    provider.expect_create_checkout_session().never();
    let api = checkout(&shop, provider);
    let err = api.create_session_for_user(&"mallory".into(), &order.order_id).await.unwrap_err();
    assert!(matches!(err, ShopError::NotOrderOwner(_)));
    let err = api.create_session_for_user(&"alice".into(), &"missing".into()).await.unwrap_err();
    assert!(matches!(err, ShopError::OrderNotFound(_)));
    tear_down(shop).await;
}
