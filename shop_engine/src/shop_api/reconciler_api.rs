//! The webhook reconciler.
//!
//! Payment providers deliver their events at least once, in no particular order, and possibly concurrently. The
//! reconciler turns that stream into at-most-once business effects:
//!
//! 1. The event is authenticated. Forged events are rejected before anything else happens.
//! 2. The event is correlated back to an order through the metadata attached when the checkout session was created.
//!    Events without correlation, or for unknown orders, are acknowledged and dropped, since redelivery cannot fix
//!    them.
//! 3. The status change and the ledger record of the event are committed in one atomic step. Only one delivery can win
//!    the change from `AwaitingPayment`.
//! 4. For a successful payment, the winner holds a claim on the event while it decrements stock for every line (at
//!    most once per line), clears the owner's cart and publishes `OrderPaid`. If any of these fail on a storage error,
//!    the claim is released and the error is returned so the provider redelivers. The redelivery takes over the claim
//!    and resumes the effects where they stopped. A claim that is never released expires after the claim timeout.
use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType},
    events::{EventProducers, EventPublisher, OrderPaidEvent},
    payment_objects::{PaymentEvent, PaymentEventKind},
    shop_api::{cart_api::CartApi, errors::ShopError, inventory_api::InventoryApi, order_flow_api::OrderFlowApi},
    traits::{LedgerEntry, LedgerOutcome, ShopDatabase, StatusChange, WebhookVerifier, DEFAULT_CLAIM_TIMEOUT_SECS},
};

/// What the reconciler did with an event. Every outcome is acknowledged to the provider as a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The order was marked as paid and all follow-up effects were applied.
    Paid(Order),
    /// The order was marked as failed.
    PaymentFailed(Order),
    /// The order had already left `AwaitingPayment`, or the event was already processed. Nothing was changed.
    Duplicate { order_id: OrderId, status: OrderStatusType },
    /// The event refers to an order that does not exist in this store.
    UnknownOrder(OrderId),
    /// The event carries no order correlation.
    Uncorrelated,
    /// The event type is not one that the reconciler acts on.
    Ignored(String),
}

pub struct ReconcilerApi<B, V> {
    db: B,
    verifier: V,
    orders: OrderFlowApi<B>,
    inventory: InventoryApi<B>,
    carts: CartApi<B>,
    producers: EventProducers,
    claim_timeout: Duration,
}

impl<B, V> Debug for ReconcilerApi<B, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconcilerApi")
    }
}

impl<B, V> ReconcilerApi<B, V>
where
    B: ShopDatabase,
    V: WebhookVerifier,
{
    pub fn new(db: B, verifier: V, producers: EventProducers) -> Self {
        let orders = OrderFlowApi::new(db.clone(), producers.clone());
        let inventory = InventoryApi::new(db.clone(), producers.clone());
        let carts = CartApi::new(db.clone());
        let claim_timeout = Duration::seconds(DEFAULT_CLAIM_TIMEOUT_SECS);
        Self { db, verifier, orders, inventory, carts, producers, claim_timeout }
    }

    /// Sets how long a delivery that stopped part-way through may hold on to an event before a redelivery takes over.
    pub fn with_claim_timeout(mut self, timeout: Duration) -> Self {
        self.claim_timeout = timeout;
        self
    }

    /// Verifies and processes the raw body of a provider webhook.
    ///
    /// Returns [`ShopError::InvalidSignature`] if the payload is not authentic. Storage errors are returned as
    /// [`ShopError::PersistenceError`], in which case the provider should redeliver the event. Every other result is
    /// an acknowledgement.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookOutcome, ShopError> {
        let event = self.verifier.verify_event(payload, signature).map_err(|e| {
            warn!("💳️ Rejected webhook: {e}");
            ShopError::from(e)
        })?;
        debug!("💳️ Verified webhook event {} ({:?})", event.event_type, event.event_id);
        self.process_event(event).await
    }

    /// Processes a verified provider event.
    pub async fn process_event(&self, event: PaymentEvent) -> Result<WebhookOutcome, ShopError> {
        let target = match event.kind {
            PaymentEventKind::PaymentSucceeded => OrderStatusType::Processing,
            PaymentEventKind::PaymentFailed => OrderStatusType::Failed,
            PaymentEventKind::Other => {
                trace!("💳️ Ignoring {} event", event.event_type);
                return Ok(WebhookOutcome::Ignored(event.event_type));
            },
        };
        let order_id = match correlate(&event) {
            Ok(id) => id,
            Err(e) => {
                warn!("💳️ {} event {:?} acknowledged without effect: {e}", event.event_type, event.event_id);
                return Ok(WebhookOutcome::Uncorrelated);
            },
        };
        let Some(order) = self.db.fetch_order(&order_id).await? else {
            warn!("💳️ {} event for unknown order {order_id} acknowledged without effect", event.event_type);
            return Ok(WebhookOutcome::UnknownOrder(order_id));
        };
        if let Some(user_id) = &event.user_id {
            if user_id != &order.user_id {
                warn!("💳️ Event for order {order_id} names {user_id}, but the order belongs to {}", order.user_id);
            }
        }
        let entry = LedgerEntry::new(event.event_id.clone(), order_id.clone(), &event.event_type, target)
            .with_claim_timeout(self.claim_timeout);
        let event_id = entry.event_id.clone();
        let change = StatusChange::new(order_id.clone(), OrderStatusType::AwaitingPayment, target)
            .with_payment_intent(event.payment_intent_id.clone());
        let order = match self.orders.apply_payment_outcome(entry, change).await? {
            LedgerOutcome::Duplicate(o) => return Ok(WebhookOutcome::Duplicate { order_id, status: o.status }),
            LedgerOutcome::Applied(o) | LedgerOutcome::Resumed(o) => o,
        };
        let result = match target {
            OrderStatusType::Processing => self.apply_paid_effects(&event_id, order).await,
            _ => self.apply_failed_effects(&event_id, order).await,
        };
        if result.is_err() {
            if let Err(e) = self.db.release_webhook_event(&event_id).await {
                warn!("💳️ Could not release event {event_id}: {e}. A redelivery will take over once the claim expires.");
            }
        }
        result
    }

    async fn apply_paid_effects(&self, event_id: &str, order: Order) -> Result<WebhookOutcome, ShopError> {
        let order_id = &order.order_id;
        for item in &order.items {
            match self.inventory.decrement_for_order(order_id, &item.product_id, item.quantity).await {
                Ok(_) => {},
                Err(ShopError::ProductNotFound(pid)) => {
                    warn!(
                        "💳️📦️ Order {order_id} is paid, but product {pid} no longer exists. {} units could not be \
                         taken from stock. Reconcile manually.",
                        item.quantity
                    );
                },
                Err(e) => {
                    error!("💳️📦️ Stock decrement for order {order_id} failed: {e}. The provider will redeliver.");
                    return Err(e);
                },
            }
        }
        self.carts.clear(&order.user_id).await?;
        self.db.complete_webhook_event(event_id).await?;
        self.producers.publish(OrderPaidEvent::new(&order).into());
        info!("💳️ Order {order_id} paid. Stock reconciled and cart cleared for {}", order.user_id);
        Ok(WebhookOutcome::Paid(order))
    }

    async fn apply_failed_effects(&self, event_id: &str, order: Order) -> Result<WebhookOutcome, ShopError> {
        self.db.complete_webhook_event(event_id).await?;
        self.orders.notify_order_updated(&order);
        info!("💳️ Payment for order {} failed", order.order_id);
        Ok(WebhookOutcome::PaymentFailed(order))
    }
}

/// Maps a provider event back to the order it concerns.
pub fn correlate(event: &PaymentEvent) -> Result<OrderId, ShopError> {
    event.order_id.clone().filter(|id| !id.as_str().trim().is_empty()).ok_or(ShopError::MissingCorrelation)
}
