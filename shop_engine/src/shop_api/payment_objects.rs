use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Order, OrderId, UserId};

/// One line of a hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub name: String,
    pub image: Option<String>,
    pub unit_amount: Cents,
    pub quantity: i64,
}

/// Everything the payment provider needs to build a hosted checkout session for an order.
///
/// `order_id` and `user_id` are opaque correlation metadata. The provider echoes them back on every webhook event for
/// the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub line_items: Vec<CheckoutLine>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutRequest {
    pub fn total(&self) -> Cents {
        self.line_items.iter().map(|l| l.unit_amount * l.quantity).sum()
    }
}

/// The provider's handle for a newly created checkout session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSession {
    pub session_id: String,
    pub url: Option<String>,
    pub payment_intent_id: Option<String>,
}

/// The result of creating a checkout session for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: Option<String>,
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    /// The customer completed checkout and the payment was taken.
    PaymentSucceeded,
    /// The provider could not take the payment.
    PaymentFailed,
    /// Any other event type. These are acknowledged and otherwise ignored.
    Other,
}

/// A verified, decoded payment-provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentEvent {
    pub event_id: Option<String>,
    pub event_type: String,
    pub kind: PaymentEventKind,
    pub order_id: Option<OrderId>,
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub payment_intent_id: Option<String>,
}

impl PaymentEvent {
    pub fn new<S: Into<String>>(event_type: S, kind: PaymentEventKind) -> Self {
        Self {
            event_id: None,
            event_type: event_type.into(),
            kind,
            order_id: None,
            user_id: None,
            session_id: None,
            payment_intent_id: None,
        }
    }

    pub fn with_event_id<S: Into<String>>(mut self, event_id: S) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_user_id(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_payment_intent<S: Into<String>>(mut self, payment_intent_id: S) -> Self {
        self.payment_intent_id = Some(payment_intent_id.into());
        self
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
