#![allow(dead_code)]
pub mod prepare_env;

use std::sync::{Arc, Mutex};

use mockall::mock;
use shop_common::Cents;
use shop_engine::{
    db_types::{CartItem, NewProduct, Product, ShippingAddress, UserId},
    events::{EventProducers, EventPublisher, ShopEvent},
    payment_objects::PaymentEvent,
    traits::WebhookError,
    CartManagement,
    InventoryManagement,
    SqliteDatabase,
    WebhookVerifier,
};

mock! {
    pub Verifier {}
    impl WebhookVerifier for Verifier {
        fn verify_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, WebhookError>;
    }
}

/// Collects every published event, in order.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<ShopEvent>>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<ShopEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.events().iter().map(|e| e.topic()).collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.topics().iter().filter(|t| t.as_str() == topic).count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: ShopEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct TestShop {
    pub db: SqliteDatabase,
    pub events: RecordingPublisher,
}

impl TestShop {
    pub fn producers(&self) -> EventProducers {
        EventProducers::default().with_publisher(self.events.clone())
    }
}

pub async fn setup() -> TestShop {
    let url = prepare_env::random_db_path();
    prepare_env::prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    TestShop { db, events: RecordingPublisher::default() }
}

pub async fn tear_down(shop: TestShop) {
    prepare_env::tear_down(shop.db).await;
}

pub fn sample_address() -> ShippingAddress {
    ShippingAddress {
        address: "21 Jump Street".to_string(),
        city: "Springfield".to_string(),
        postal_code: "49007".to_string(),
        country: "USA".to_string(),
    }
}

pub async fn seed_product(db: &SqliteDatabase, id: &str, price: i64, stock: i64) -> Product {
    let product = NewProduct::new(id.into(), format!("Product {id}"), Cents::from(price), stock);
    db.upsert_product(product).await.expect("Error seeding product")
}

/// Puts items in the cart directly, skipping the stock check that `CartApi::add_item` does.
pub async fn fill_cart(db: &SqliteDatabase, user_id: &UserId, product: &Product, quantity: i64) {
    let item = CartItem {
        product_id: product.product_id.clone(),
        quantity,
        price: product.price,
        name: product.name.clone(),
        image: product.image.clone(),
    };
    db.add_cart_item(user_id, item).await.expect("Error filling cart");
}
