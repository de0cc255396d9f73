use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StripeApiError;

/// Metadata key for the shop's order id. Stripe echoes metadata back on every event for the session.
pub const METADATA_ORDER_ID: &str = "orderId";
/// Metadata key for the id of the user that owns the order.
pub const METADATA_USER_ID: &str = "userId";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub name: String,
    pub images: Vec<String>,
    /// In the smallest currency unit, i.e. cents.
    pub unit_amount: i64,
    pub quantity: i64,
}

/// The parameters for `POST /v1/checkout/sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCheckoutSession {
    pub currency: String,
    pub line_items: Vec<NewLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub client_reference_id: Option<String>,
    /// Attached to the session and to its payment intent.
    pub metadata: BTreeMap<String, String>,
}

impl NewCheckoutSession {
    /// Flattens the session into Stripe's form encoding, which uses bracketed keys for nested values.
    pub fn to_form_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("mode".to_string(), "payment".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];
        if let Some(id) = &self.client_reference_id {
            params.push(("client_reference_id".to_string(), id.clone()));
        }
        for (key, value) in &self.metadata {
            params.push((format!("metadata[{key}]"), value.clone()));
            params.push((format!("payment_intent_data[metadata][{key}]"), value.clone()));
        }
        for (i, item) in self.line_items.iter().enumerate() {
            let prefix = format!("line_items[{i}]");
            params.push((format!("{prefix}[price_data][currency]"), self.currency.clone()));
            params.push((format!("{prefix}[price_data][product_data][name]"), item.name.clone()));
            for (j, image) in item.images.iter().enumerate() {
                params.push((format!("{prefix}[price_data][product_data][images][{j}]"), image.clone()));
            }
            params.push((format!("{prefix}[price_data][unit_amount]"), item.unit_amount.to_string()));
            params.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
}

impl CheckoutSessionObject {
    /// The order id from the metadata, falling back to the client reference id.
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_ORDER_ID).map(String::as_str).or(self.client_reference_id.as_deref())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(String::as_str)
    }

    /// Delayed payment methods complete the session before the money arrives. Those sessions are not yet paid.
    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_deref(), Some("paid") | Some("no_payment_required"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl PaymentIntentObject {
    pub fn order_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_ORDER_ID).map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get(METADATA_USER_ID).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

impl StripeEvent {
    pub fn from_payload(payload: &[u8]) -> Result<Self, StripeApiError> {
        serde_json::from_slice(payload).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }

    /// The event's object, as a checkout session. Valid for `checkout.session.*` events.
    pub fn checkout_session(&self) -> Result<CheckoutSessionObject, StripeApiError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }

    /// The event's object, as a payment intent. Valid for `payment_intent.*` events.
    pub fn payment_intent(&self) -> Result<PaymentIntentObject, StripeApiError> {
        serde_json::from_value(self.data.object.clone()).map_err(|e| StripeApiError::JsonError(e.to_string()))
    }
}
