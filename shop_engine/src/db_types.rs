use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
pub use shop_common::Cents;
use sqlx::{FromRow, Type};
use thiserror::Error;

macro_rules! string_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
    };
}

//--------------------------------------     Identifiers     ---------------------------------------------------------
string_id!(OrderId, "#");
string_id!(UserId, "@");
string_id!(ProductId, "");

impl OrderId {
    /// Generates a fresh, opaque order identifier.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created from the cart and is waiting for the payment provider to confirm payment.
    AwaitingPayment,
    /// Payment has been confirmed. The order is being prepared for shipment.
    Processing,
    /// The order has left the warehouse.
    Shipped,
    /// The order has been delivered to the customer.
    Delivered,
    /// The order was cancelled by an administrator.
    Cancelled,
    /// The payment provider reported that the payment failed.
    Failed,
}

impl OrderStatusType {
    /// `Delivered`, `Cancelled` and `Failed` are terminal. No transition out of these states is legal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// The legal-transition table for orders.
    ///
    /// | From            | To         |
    /// |-----------------|------------|
    /// | AwaitingPayment | Processing |
    /// | AwaitingPayment | Failed     |
    /// | Processing      | Shipped    |
    /// | Shipped         | Delivered  |
    /// | non-terminal    | Cancelled  |
    pub fn can_transition_to(&self, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match (self, to) {
            (AwaitingPayment, Processing) | (AwaitingPayment, Failed) => true,
            (Processing, Shipped) | (Shipped, Delivered) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Only these statuses may be set by an administrator. `Processing` and `Failed` are reserved for the payment
    /// provider.
    pub fn is_admin_settable(&self) -> bool {
        matches!(self, Self::Shipped | Self::Delivered | Self::Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::AwaitingPayment => write!(f, "AwaitingPayment"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to AwaitingPayment");
            OrderStatusType::AwaitingPayment
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace([' ', '_', '-'], "").as_str() {
            "awaitingpayment" | "pendingpayment" => Ok(Self::AwaitingPayment),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            _ => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------   ShippingAddress     ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Returns the names of the fields that are empty (after trimming whitespace).
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("address", &self.address),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.trim().is_empty().then_some(name))
        .collect()
    }
}

//--------------------------------------       Product         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Cents,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price: Cents,
    pub stock: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(product_id: ProductId, name: S, price: Cents, stock: i64) -> Self {
        Self { product_id, name: name.into(), image: None, price, stock }
    }

    pub fn with_image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }
}

//--------------------------------------         Cart          ---------------------------------------------------------
/// A single line in a user's live cart. Price, name and image are captured when the item is added.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub price: Cents,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_price(&self) -> Cents {
        self.items.iter().map(|i| i.price * i.quantity).sum()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

//--------------------------------------       LineItem        ---------------------------------------------------------
/// An immutable order line, frozen at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i64,
    pub unit_price: Cents,
}

impl LineItem {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i64,
    pub unit_price: Cents,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(skip)]
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: UserId,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
    #[sqlx(flatten)]
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Cents,
    pub tax_price: Cents,
    pub shipping_price: Cents,
    pub total_price: Cents,
    pub status: OrderStatusType,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// The opaque order id, generated when the order is created
    pub order_id: OrderId,
    /// The user who placed the order
    pub user_id: UserId,
    /// The frozen cart lines
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub items_price: Cents,
    pub tax_price: Cents,
    pub shipping_price: Cents,
    pub total_price: Cents,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  WebhookEventRecord   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
pub enum WebhookEventStatus {
    /// The status change for the event has been committed and a delivery is applying the follow-up effects.
    Applying,
    /// A delivery failed part-way through the follow-up effects. The next delivery may take them over.
    Released,
    /// All effects for the event have been applied.
    Completed,
}

impl Display for WebhookEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookEventStatus::Applying => write!(f, "Applying"),
            WebhookEventStatus::Released => write!(f, "Released"),
            WebhookEventStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WebhookEventRecord {
    pub event_id: String,
    pub order_id: OrderId,
    pub event_type: String,
    pub status: WebhookEventStatus,
    /// When the current delivery claimed the follow-up effects
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
