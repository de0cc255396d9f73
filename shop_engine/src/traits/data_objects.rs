use chrono::{DateTime, Duration, Utc};

use crate::db_types::{Order, OrderId, OrderStatusType};

/// A conditional status change: the order moves to `to` only if it is currently in `from`.
///
/// Moving to `Processing` also marks the order as paid, moving to `Shipped` stamps `shipped_at` and moving to
/// `Delivered` marks the order as delivered. Timestamps that are already set are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    pub payment_intent_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl StatusChange {
    pub fn new(order_id: OrderId, from: OrderStatusType, to: OrderStatusType) -> Self {
        Self { order_id, from, to, payment_intent_id: None, at: Utc::now() }
    }

    pub fn with_payment_intent(mut self, payment_intent_id: Option<String>) -> Self {
        self.payment_intent_id = payment_intent_id;
        self
    }

    pub fn marks_paid(&self) -> bool {
        self.to == OrderStatusType::Processing
    }

    pub fn marks_shipped(&self) -> bool {
        self.to == OrderStatusType::Shipped
    }

    pub fn marks_delivered(&self) -> bool {
        self.to == OrderStatusType::Delivered
    }
}

/// How long a delivery may hold the follow-up effects of an event before a redelivery can take them over.
pub const DEFAULT_CLAIM_TIMEOUT_SECS: i64 = 300;

/// A payment-provider event, as recorded in the webhook ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub event_id: String,
    pub order_id: OrderId,
    pub event_type: String,
    /// When this delivery claims the event
    pub claimed_at: DateTime<Utc>,
    /// Claims made at or before this instant are considered abandoned
    pub stale_before: DateTime<Utc>,
}

impl LedgerEntry {
    /// Builds a ledger entry. When the provider did not supply an event id, the entry is keyed on the order and the
    /// status the event drives it to.
    pub fn new(event_id: Option<String>, order_id: OrderId, event_type: &str, target: OrderStatusType) -> Self {
        let event_id = event_id.unwrap_or_else(|| format!("{}:{target}", order_id.as_str()));
        let claimed_at = Utc::now();
        let stale_before = claimed_at - Duration::seconds(DEFAULT_CLAIM_TIMEOUT_SECS);
        Self { event_id, order_id, event_type: event_type.to_string(), claimed_at, stale_before }
    }

    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.stale_before = self.claimed_at - timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// This event won the status change. The follow-up effects must now be applied.
    Applied(Order),
    /// This event won the status change on an earlier delivery, which gave up or abandoned the follow-up effects.
    /// This delivery now holds the claim and must apply them.
    Resumed(Order),
    /// The event has already been fully processed, or the order was not in the expected state. Nothing was changed.
    Duplicate(Order),
}

impl LedgerOutcome {
    pub fn order(&self) -> &Order {
        match self {
            LedgerOutcome::Applied(o) | LedgerOutcome::Resumed(o) | LedgerOutcome::Duplicate(o) => o,
        }
    }
}
