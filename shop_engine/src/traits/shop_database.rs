use thiserror::Error;

use crate::{
    db_types::{OrderId, ProductId, UserId},
    traits::{CartManagement, InventoryManagement, OrderManagement, WebhookLedger},
};

/// The full backend that the shop engine runs against.
///
/// Backends are cheap to clone. Every API object holds its own clone.
#[allow(async_fn_in_trait)]
pub trait ShopDatabase: Clone + InventoryManagement + CartManagement + OrderManagement + WebhookLedger {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes all connections to the database.
    async fn close(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("There is no {1} line in the cart for {0}")]
    CartItemNotFound(UserId, ProductId),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
