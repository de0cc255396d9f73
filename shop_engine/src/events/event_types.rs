use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{Cents, Order, OrderId, OrderStatusType, ProductId, UserId};

pub const STOCK_UPDATE_TOPIC: &str = "stockUpdate";
pub const ORDER_PAID_TOPIC: &str = "orderPaymentSuccess";
pub const ORDER_UPDATE_TOPIC: &str = "orderUpdate";
pub const ORDER_CREATED_TOPIC: &str = "newOrderCreated";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChangedEvent {
    pub product_id: ProductId,
    pub new_stock: i64,
}

impl StockChangedEvent {
    pub fn new(product_id: ProductId, new_stock: i64) -> Self {
        Self { product_id, new_stock }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPaidEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub message: String,
}

impl OrderPaidEvent {
    pub fn new(order: &Order) -> Self {
        let message = format!("Payment for order {} was successful!", order.order_id.as_str());
        Self { order_id: order.order_id.clone(), user_id: order.user_id.clone(), message }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdatedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatusType,
    pub is_paid: bool,
    pub message: String,
}

impl OrderUpdatedEvent {
    pub fn new(order: &Order) -> Self {
        let message = match order.status {
            OrderStatusType::Failed => format!("Payment for order {} failed. Please try again.", order.order_id.as_str()),
            status => format!("Order {} is now {status}.", order.order_id.as_str()),
        };
        Self {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            status: order.status,
            is_paid: order.is_paid,
            message,
        }
    }

    /// The per-user topic, so that clients can listen for updates to their own orders only.
    pub fn user_topic(&self) -> String {
        format!("user-{}-{ORDER_UPDATE_TOPIC}", self.user_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub total_price: Cents,
}

impl OrderCreatedEvent {
    pub fn new(order: &Order) -> Self {
        Self { order_id: order.order_id.clone(), user_id: order.user_id.clone(), total_price: order.total_price }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopEvent {
    StockChanged(StockChangedEvent),
    OrderPaid(OrderPaidEvent),
    OrderUpdated(OrderUpdatedEvent),
    OrderCreated(OrderCreatedEvent),
}

impl ShopEvent {
    /// The topic name that clients subscribe to.
    pub fn topic(&self) -> String {
        match self {
            ShopEvent::StockChanged(_) => STOCK_UPDATE_TOPIC.to_string(),
            ShopEvent::OrderPaid(_) => ORDER_PAID_TOPIC.to_string(),
            ShopEvent::OrderUpdated(ev) => ev.user_topic(),
            ShopEvent::OrderCreated(_) => ORDER_CREATED_TOPIC.to_string(),
        }
    }

    pub fn payload(&self) -> Value {
        let result = match self {
            ShopEvent::StockChanged(ev) => serde_json::to_value(ev),
            ShopEvent::OrderPaid(ev) => serde_json::to_value(ev),
            ShopEvent::OrderUpdated(ev) => serde_json::to_value(ev),
            ShopEvent::OrderCreated(ev) => serde_json::to_value(ev),
        };
        // These are plain structs of strings and integers, so serialization cannot fail
        result.unwrap_or(Value::Null)
    }
}

impl From<StockChangedEvent> for ShopEvent {
    fn from(ev: StockChangedEvent) -> Self {
        Self::StockChanged(ev)
    }
}

impl From<OrderPaidEvent> for ShopEvent {
    fn from(ev: OrderPaidEvent) -> Self {
        Self::OrderPaid(ev)
    }
}

impl From<OrderUpdatedEvent> for ShopEvent {
    fn from(ev: OrderUpdatedEvent) -> Self {
        Self::OrderUpdated(ev)
    }
}

impl From<OrderCreatedEvent> for ShopEvent {
    fn from(ev: OrderCreatedEvent) -> Self {
        Self::OrderCreated(ev)
    }
}
