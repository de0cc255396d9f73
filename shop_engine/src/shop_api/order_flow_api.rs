use std::{fmt::Debug, sync::Arc};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderId, OrderStatusType, ShippingAddress, UserId},
    events::{EventProducers, EventPublisher, OrderCreatedEvent, OrderUpdatedEvent},
    shop_api::{
        errors::ShopError,
        pricing::{PricingPolicy, StandardPricing},
    },
    traits::{LedgerEntry, LedgerOutcome, OrderManagement, StatusChange, WebhookLedger},
};

/// `OrderFlowApi` is the order state machine. It creates orders and is the only component that changes an order's
/// status.
///
/// The legal transitions are
/// ```text
///   AwaitingPayment ──► Processing ──► Shipped ──► Delivered
///         │                 │             │
///         ├──► Failed       └─────────────┴──► Cancelled
///         └──► Cancelled
/// ```
/// `Delivered`, `Cancelled` and `Failed` are terminal.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    pricing: Arc<dyn PricingPolicy>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, pricing: Arc::new(StandardPricing::default()) }
    }

    pub fn with_pricing<P: PricingPolicy + 'static>(mut self, pricing: P) -> Self {
        self.pricing = Arc::new(pricing);
        self
    }

    /// Checks the customer-supplied details of an order. All four address fields and the payment method must be
    /// non-empty.
    pub fn validate_order_details(&self, address: &ShippingAddress, payment_method: &str) -> Result<(), ShopError> {
        let missing = address.missing_fields();
        if !missing.is_empty() {
            return Err(ShopError::ValidationError(format!(
                "Shipping address is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }
        if payment_method.trim().is_empty() {
            return Err(ShopError::ValidationError("Payment method is required".to_string()));
        }
        Ok(())
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + WebhookLedger
{
    /// Creates a new order from frozen line items. The money fields are derived once, here, by the pricing policy and
    /// stored with the order. The order starts out `AwaitingPayment`.
    pub async fn create_order(
        &self,
        user_id: &UserId,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        payment_method: &str,
    ) -> Result<Order, ShopError> {
        self.validate_order_details(&shipping_address, payment_method)?;
        if items.is_empty() {
            return Err(ShopError::EmptyOrder);
        }
        if let Some(bad) = items.iter().find(|i| i.quantity < 1) {
            return Err(ShopError::ValidationError(format!(
                "Quantity for {} must be at least 1. Got {}",
                bad.product_id, bad.quantity
            )));
        }
        let price = self.pricing.price(&items);
        let order = NewOrder {
            order_id: OrderId::random(),
            user_id: user_id.clone(),
            items,
            shipping_address,
            payment_method: payment_method.trim().to_string(),
            items_price: price.items_price,
            tax_price: price.tax_price,
            shipping_price: price.shipping_price,
            total_price: price.total_price,
            created_at: Utc::now(),
        };
        let order = self.db.insert_order(order).await?;
        info!(
            "🔄️📦️ Order {} created for {user_id}. {} lines, total {}",
            order.order_id,
            order.items.len(),
            order.total_price
        );
        self.producers.publish(OrderCreatedEvent::new(&order).into());
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ShopError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| ShopError::OrderNotFound(order_id.clone()))
    }

    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, ShopError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        Ok(orders)
    }

    pub async fn all_orders(&self) -> Result<Vec<Order>, ShopError> {
        let orders = self.db.fetch_all_orders().await?;
        Ok(orders)
    }

    /// Moves the order to `to`, if the legal-transition table allows it.
    ///
    /// The change is applied as a compare-and-swap on the status the order had when it was read. If another caller
    /// changed the status in the meantime, the transition is re-checked against the new status and rejected with
    /// [`ShopError::IllegalTransition`].
    pub async fn transition(&self, order_id: &OrderId, to: OrderStatusType) -> Result<Order, ShopError> {
        let order = self.fetch_order(order_id).await?;
        let from = order.status;
        if !from.can_transition_to(to) {
            error!("🔄️ Illegal transition requested for order {order_id}: {from} -> {to}");
            return Err(ShopError::IllegalTransition { from, to });
        }
        let change = StatusChange::new(order_id.clone(), from, to);
        match self.db.compare_and_set_status(change).await? {
            Some(order) => {
                info!("🔄️ Order {order_id} moved from {from} to {to}");
                self.producers.publish(OrderUpdatedEvent::new(&order).into());
                Ok(order)
            },
            None => {
                let current = self.fetch_order(order_id).await?.status;
                error!(
                    "🔄️ Order {order_id} changed from {from} to {current} while a transition to {to} was in progress"
                );
                Err(ShopError::IllegalTransition { from: current, to })
            },
        }
    }

    /// Marks the order as shipped, stamping `shipped_at`.
    pub async fn mark_shipped(&self, order_id: &OrderId) -> Result<Order, ShopError> {
        self.transition(order_id, OrderStatusType::Shipped).await
    }

    /// Marks the order as delivered, setting `is_delivered` and stamping `delivered_at`.
    pub async fn mark_delivered(&self, order_id: &OrderId) -> Result<Order, ShopError> {
        self.transition(order_id, OrderStatusType::Delivered).await
    }

    pub async fn cancel(&self, order_id: &OrderId) -> Result<Order, ShopError> {
        self.transition(order_id, OrderStatusType::Cancelled).await
    }

    /// An administrator's status update. Administrators may only ship, deliver or cancel orders. Payment outcomes are
    /// reserved for the payment provider.
    pub async fn admin_update_status(&self, order_id: &OrderId, to: OrderStatusType) -> Result<Order, ShopError> {
        if !to.is_admin_settable() {
            warn!("🔄️ Administrator tried to set order {order_id} to {to}");
            return Err(ShopError::ValidationError(format!(
                "Status {to} cannot be set manually. Only Shipped, Delivered or Cancelled are allowed"
            )));
        }
        match to {
            OrderStatusType::Shipped => self.mark_shipped(order_id).await,
            OrderStatusType::Delivered => self.mark_delivered(order_id).await,
            _ => self.cancel(order_id).await,
        }
    }

    /// Applies a payment-provider outcome to the order, recording the provider's event in the webhook ledger in the
    /// same atomic step.
    ///
    /// No events are published here. The caller is responsible for the follow-up effects and notifications.
    pub async fn apply_payment_outcome(
        &self,
        entry: LedgerEntry,
        change: StatusChange,
    ) -> Result<LedgerOutcome, ShopError> {
        if !change.from.can_transition_to(change.to) {
            error!("🔄️💳️ Illegal payment transition for order {}: {} -> {}", change.order_id, change.from, change.to);
            return Err(ShopError::IllegalTransition { from: change.from, to: change.to });
        }
        let order_id = change.order_id.clone();
        let outcome = self.db.record_payment_event(entry, change).await?;
        match &outcome {
            LedgerOutcome::Applied(o) => info!("🔄️💳️ Order {order_id} is now {}", o.status),
            LedgerOutcome::Resumed(o) => info!("🔄️💳️ Order {order_id} is already {}. Resuming follow-up effects", o.status),
            LedgerOutcome::Duplicate(o) => {
                info!("🔄️💳️ Order {order_id} is {}. Payment event discarded as duplicate or stale", o.status)
            },
        }
        Ok(outcome)
    }

    /// Publishes the current state of the order on the owner's update topic.
    pub fn notify_order_updated(&self, order: &Order) {
        self.producers.publish(OrderUpdatedEvent::new(order).into());
    }
}
