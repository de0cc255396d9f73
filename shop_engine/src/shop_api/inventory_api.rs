use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, OrderId, Product, ProductId},
    events::{EventProducers, EventPublisher, StockChangedEvent},
    shop_api::errors::ShopError,
    traits::InventoryManagement,
};

/// `InventoryApi` is the inventory ledger. It is the only way that stock levels change, and every change is published
/// as a [`StockChangedEvent`].
pub struct InventoryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    fn notify_stock_changed(&self, product_id: &ProductId, new_stock: i64) {
        trace!("📦️ Stock for {product_id} is now {new_stock}");
        self.producers.publish(StockChangedEvent::new(product_id.clone(), new_stock).into());
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn fetch_product(&self, product_id: &ProductId) -> Result<Product, ShopError> {
        self.db.fetch_product(product_id).await?.ok_or_else(|| ShopError::ProductNotFound(product_id.clone()))
    }

    /// Adds a product to the catalog, or replaces it. The stock level is published if it changed.
    pub async fn upsert_product(&self, product: NewProduct) -> Result<Product, ShopError> {
        let old_stock = self.db.fetch_product(&product.product_id).await?.map(|p| p.stock);
        let product = self.db.upsert_product(product).await?;
        if old_stock != Some(product.stock) {
            self.notify_stock_changed(&product.product_id, product.stock);
        }
        Ok(product)
    }

    /// Reduces the stock of the product by `quantity`. Stock never goes below zero.
    pub async fn decrement(&self, product_id: &ProductId, quantity: i64) -> Result<i64, ShopError> {
        validate_quantity(quantity)?;
        let new_stock = self.db.decrement_stock(product_id, quantity).await?;
        debug!("📦️ Stock for {product_id} decremented by {quantity} to {new_stock}");
        self.notify_stock_changed(product_id, new_stock);
        Ok(new_stock)
    }

    pub async fn increment(&self, product_id: &ProductId, quantity: i64) -> Result<i64, ShopError> {
        validate_quantity(quantity)?;
        let new_stock = self.db.increment_stock(product_id, quantity).await?;
        debug!("📦️ Stock for {product_id} incremented by {quantity} to {new_stock}");
        self.notify_stock_changed(product_id, new_stock);
        Ok(new_stock)
    }

    /// Sets the stock for the product to an absolute value. Used for administrative corrections.
    pub async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<i64, ShopError> {
        if stock < 0 {
            return Err(ShopError::ValidationError(format!("Stock cannot be negative. Got {stock}")));
        }
        let new_stock = self.db.set_stock(product_id, stock).await?;
        info!("📦️ Stock for {product_id} set to {new_stock}");
        self.notify_stock_changed(product_id, new_stock);
        Ok(new_stock)
    }

    /// Takes a product off sale. Its stock drops to zero, which is published like any other stock change.
    pub async fn retire_product(&self, product_id: &ProductId) -> Result<(), ShopError> {
        let new_stock = self.db.set_stock(product_id, 0).await?;
        info!("📦️ Product {product_id} retired");
        self.notify_stock_changed(product_id, new_stock);
        Ok(())
    }

    /// Decrements stock for one line of a paid order, at most once per order and product.
    ///
    /// Returns `Some(new_stock)` if stock was decremented, or `None` if this line had already been decremented.
    pub async fn decrement_for_order(
        &self,
        order_id: &OrderId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<i64>, ShopError> {
        validate_quantity(quantity)?;
        let result = self.db.decrement_stock_for_order(order_id, product_id, quantity).await?;
        match result {
            Some(new_stock) => {
                debug!("📦️ Order {order_id}: stock for {product_id} decremented by {quantity} to {new_stock}");
                self.notify_stock_changed(product_id, new_stock);
            },
            None => debug!("📦️ Order {order_id}: stock for {product_id} was already decremented. Skipping."),
        }
        Ok(result)
    }
}

fn validate_quantity(quantity: i64) -> Result<(), ShopError> {
    if quantity < 1 {
        return Err(ShopError::ValidationError(format!("Quantity must be at least 1. Got {quantity}")));
    }
    Ok(())
}
