//! `SqliteDatabase` is a concrete implementation of a shop engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, products, webhook_events};
use crate::{
    db_types::{
        Cart,
        CartItem,
        NewOrder,
        NewProduct,
        Order,
        OrderId,
        Product,
        ProductId,
        UserId,
        WebhookEventRecord,
        WebhookEventStatus,
    },
    traits::{
        CartManagement,
        InventoryManagement,
        LedgerEntry,
        LedgerOutcome,
        OrderManagement,
        ShopDatabase,
        StatusChange,
        StoreError,
        WebhookLedger,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `SHOP_DATABASE_URL`, or the default.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl ShopDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await?;
        let product = products::upsert_product(product, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product {} saved with stock {}", product.product_id, product.stock);
        Ok(product)
    }

    async fn decrement_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stock = products::decrement_stock(product_id, quantity, &mut tx)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        tx.commit().await?;
        Ok(stock)
    }

    async fn increment_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stock = products::increment_stock(product_id, quantity, &mut tx)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        tx.commit().await?;
        Ok(stock)
    }

    async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let stock = products::set_stock(product_id, stock, &mut tx)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        tx.commit().await?;
        Ok(stock)
    }

    /// The movement record and the decrement are committed together. If the product no longer exists the whole
    /// transaction is rolled back, so that a later retry can try again.
    async fn decrement_stock_for_order(
        &self,
        order_id: &OrderId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<i64>, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !products::record_stock_movement(order_id, product_id, quantity, &mut tx).await? {
            trace!("🗃️ Stock movement for {order_id}/{product_id} already recorded");
            return Ok(None);
        }
        let stock = products::decrement_stock(product_id, quantity, &mut tx)
            .await?
            .ok_or_else(|| StoreError::ProductNotFound(product_id.clone()))?;
        tx.commit().await?;
        Ok(Some(stock))
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_or_create_cart(&self, user_id: &UserId) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;
        let cart = carts::fetch_or_create_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn add_cart_item(&self, user_id: &UserId, item: CartItem) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;
        carts::fetch_or_create_cart(user_id, &mut tx).await?;
        carts::upsert_cart_item(user_id, item, &mut tx).await?;
        let cart = carts::fetch_or_create_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn remove_cart_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !carts::remove_cart_item(user_id, product_id, &mut tx).await? {
            return Err(StoreError::CartItemNotFound(user_id.clone(), product_id.clone()));
        }
        let cart = carts::fetch_or_create_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        Ok(cart)
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = carts::clear_cart(user_id, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Removed {removed} lines from the cart for {user_id}");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_all_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn compare_and_set_status(&self, change: StatusChange) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::compare_and_set_status(&change, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn save_checkout_session(
        &self,
        order_id: &OrderId,
        session_id: &str,
        payment_intent_id: Option<&str>,
    ) -> Result<Option<Order>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::save_checkout_session(order_id, session_id, payment_intent_id, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }
}

impl WebhookLedger for SqliteDatabase {
    async fn fetch_webhook_event(&self, event_id: &str) -> Result<Option<WebhookEventRecord>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let record = webhook_events::fetch_event(event_id, &mut conn).await?;
        Ok(record)
    }

    /// The ledger insert is the first statement in the transaction, so the write lock is taken before anything is
    /// read, and concurrent deliveries queue up behind each other rather than deadlocking.
    async fn record_payment_event(&self, entry: LedgerEntry, change: StatusChange) -> Result<LedgerOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let event_id = entry.event_id.clone();
        let order_id = change.order_id.clone();
        let outcome = if webhook_events::insert_event(&entry, &mut tx).await? {
            match orders::compare_and_set_status(&change, &mut tx).await? {
                Some(order) => LedgerOutcome::Applied(order),
                None => {
                    webhook_events::set_event_status(&event_id, WebhookEventStatus::Completed, &mut tx).await?;
                    let order = orders::fetch_order_by_order_id(&order_id, &mut tx)
                        .await?
                        .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
                    LedgerOutcome::Duplicate(order)
                },
            }
        } else {
            let order = orders::fetch_order_by_order_id(&order_id, &mut tx)
                .await?
                .ok_or_else(|| StoreError::OrderNotFound(order_id.clone()))?;
            let claimed = order.status == change.to &&
                webhook_events::claim_event(&event_id, entry.claimed_at, entry.stale_before, &mut tx).await?;
            if claimed {
                LedgerOutcome::Resumed(order)
            } else {
                LedgerOutcome::Duplicate(order)
            }
        };
        tx.commit().await?;
        trace!("🗃️ Event {event_id} for order {order_id} recorded: {}", match &outcome {
            LedgerOutcome::Applied(_) => "applied",
            LedgerOutcome::Resumed(_) => "resumed",
            LedgerOutcome::Duplicate(_) => "duplicate",
        });
        Ok(outcome)
    }

    async fn complete_webhook_event(&self, event_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::set_event_status(event_id, WebhookEventStatus::Completed, &mut conn).await?;
        Ok(())
    }

    async fn release_webhook_event(&self, event_id: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::set_event_status(event_id, WebhookEventStatus::Released, &mut conn).await?;
        trace!("🗃️ Released the claim on event {event_id}");
        Ok(())
    }
}
