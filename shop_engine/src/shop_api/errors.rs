use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, ProductId},
    traits::{PaymentProviderError, StoreError, WebhookError},
};

#[derive(Debug, Clone, Error)]
pub enum ShopError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Product {0} is not in the cart")]
    CartItemNotFound(ProductId),
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Cannot create an order without any line items")]
    EmptyOrder,
    #[error("Insufficient stock for product {product}. Only {available} available")]
    InsufficientStock { product: ProductId, available: i64 },
    #[error("Illegal order status transition from {from} to {to}")]
    IllegalTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order {0} cannot be paid for, since it is {1}")]
    OrderNotPayable(OrderId, OrderStatusType),
    #[error("Order {0} belongs to another user")]
    NotOrderOwner(OrderId),
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("The webhook event does not identify an order")]
    MissingCorrelation,
    #[error("Payment provider error: {0}")]
    PaymentProviderError(String),
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl ShopError {
    /// Errors that the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ShopError::PaymentProviderError(_) | ShopError::PersistenceError(_))
    }
}

impl From<StoreError> for ShopError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DatabaseError(s) => ShopError::PersistenceError(s),
            StoreError::ProductNotFound(id) => ShopError::ProductNotFound(id),
            StoreError::OrderNotFound(id) => ShopError::OrderNotFound(id),
            StoreError::CartItemNotFound(_, id) => ShopError::CartItemNotFound(id),
        }
    }
}

impl From<PaymentProviderError> for ShopError {
    fn from(e: PaymentProviderError) -> Self {
        ShopError::PaymentProviderError(e.to_string())
    }
}

impl From<WebhookError> for ShopError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::InvalidSignature(s) => ShopError::InvalidSignature(s),
            WebhookError::MalformedPayload(s) => ShopError::ValidationError(s),
        }
    }
}
