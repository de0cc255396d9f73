use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Order, OrderId, OrderStatusType, ShippingAddress};

/// The customer-supplied part of a new order. Everything else comes from the cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub total_price: Cents,
    pub status: OrderStatusType,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self { order_id: order.order_id.clone(), total_price: order.total_price, status: order.status }
    }
}
