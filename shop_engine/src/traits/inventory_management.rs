use crate::{
    db_types::{NewProduct, OrderId, Product, ProductId},
    traits::StoreError,
};

/// The inventory ledger storage contract.
///
/// Stock counts never go below zero. Every change must be applied as a single atomic statement against the product
/// row, and never as a read-modify-write by the caller.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_product(&self, product_id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Inserts the product, or replaces its name, image, price and stock if it already exists.
    async fn upsert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Reduces the stock by `quantity`, clamped at zero. Returns the new stock level.
    async fn decrement_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, StoreError>;

    /// Increases the stock by `quantity`. Returns the new stock level.
    async fn increment_stock(&self, product_id: &ProductId, quantity: i64) -> Result<i64, StoreError>;

    /// Sets the stock to an absolute value (clamped at zero). Returns the new stock level.
    async fn set_stock(&self, product_id: &ProductId, stock: i64) -> Result<i64, StoreError>;

    /// Decrements stock for one line of a paid order. The decrement is recorded against the order, so that it is
    /// applied at most once per (order, product) pair.
    ///
    /// Returns `Some(new_stock)` if the decrement was applied, or `None` if it had already been applied.
    async fn decrement_stock_for_order(
        &self,
        order_id: &OrderId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<Option<i64>, StoreError>;
}
