use std::{fmt::Debug, time::Duration};

use log::*;
use shop_common::SHOP_CURRENCY_CODE;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, UserId},
    payment_objects::{CheckoutLine, CheckoutRequest, CheckoutSession},
    shop_api::errors::ShopError,
    traits::{OrderManagement, PaymentProvider, PaymentProviderError},
};

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// The base URL of the storefront. The provider redirects the customer back here after checkout.
    pub frontend_url: String,
    pub currency: String,
    /// Upper bound on how long a session-creation call to the provider may take.
    pub timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5001".to_string(),
            currency: SHOP_CURRENCY_CODE.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl CheckoutConfig {
    pub fn success_url(&self) -> String {
        format!("{}/order-success.html?session_id={{CHECKOUT_SESSION_ID}}", self.frontend_url.trim_end_matches('/'))
    }

    pub fn cancel_url(&self, order_id: &OrderId) -> String {
        format!("{}/order-cancelled.html?order_id={}", self.frontend_url.trim_end_matches('/'), order_id.as_str())
    }
}

/// `CheckoutApi` is the payment session gateway. It turns an order into a hosted checkout session with the payment
/// provider.
pub struct CheckoutApi<B, P> {
    db: B,
    provider: P,
    config: CheckoutConfig,
}

impl<B, P> Debug for CheckoutApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({})", self.config.frontend_url)
    }
}

impl<B, P> CheckoutApi<B, P> {
    pub fn new(db: B, provider: P, config: CheckoutConfig) -> Self {
        Self { db, provider, config }
    }

    /// Builds the provider request from the order's frozen line items and shipping price. Live product data is never
    /// consulted.
    pub fn checkout_request(&self, order: &Order) -> CheckoutRequest {
        let mut line_items = order
            .items
            .iter()
            .map(|i| CheckoutLine {
                name: i.name.clone(),
                image: i.image.clone(),
                unit_amount: i.unit_price,
                quantity: i.quantity,
            })
            .collect::<Vec<_>>();
        if order.tax_price.is_positive() {
            line_items.push(CheckoutLine {
                name: "Tax".to_string(),
                image: None,
                unit_amount: order.tax_price,
                quantity: 1,
            });
        }
        if order.shipping_price.is_positive() {
            line_items.push(CheckoutLine {
                name: "Shipping".to_string(),
                image: None,
                unit_amount: order.shipping_price,
                quantity: 1,
            });
        }
        CheckoutRequest {
            order_id: order.order_id.clone(),
            user_id: order.user_id.clone(),
            line_items,
            currency: self.config.currency.clone(),
            success_url: self.config.success_url(),
            cancel_url: self.config.cancel_url(&order.order_id),
        }
    }
}

impl<B, P> CheckoutApi<B, P>
where
    B: OrderManagement,
    P: PaymentProvider,
{
    /// Creates a checkout session for the order on behalf of `user_id`, who must own it.
    pub async fn create_session_for_user(&self, user_id: &UserId, order_id: &OrderId) -> Result<CheckoutSession, ShopError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| ShopError::OrderNotFound(order_id.clone()))?;
        if &order.user_id != user_id {
            warn!("💳️ {user_id} tried to pay for order {order_id}, which belongs to {}", order.user_id);
            return Err(ShopError::NotOrderOwner(order_id.clone()));
        }
        self.create_session(&order).await
    }

    /// Creates a hosted checkout session for the order and stores the session handle on it.
    ///
    /// The order must be `AwaitingPayment`. Creating a second session for a pending order supersedes the first. If the
    /// provider fails or does not answer in time, the order is left untouched and the caller may try again.
    pub async fn create_session(&self, order: &Order) -> Result<CheckoutSession, ShopError> {
        if order.status != OrderStatusType::AwaitingPayment {
            return Err(ShopError::OrderNotPayable(order.order_id.clone(), order.status));
        }
        let request = self.checkout_request(order);
        if request.total() != order.total_price {
            warn!(
                "💳️ Checkout total {} for order {} does not match the order total {}",
                request.total(),
                order.order_id,
                order.total_price
            );
        }
        let order_id = order.order_id.clone();
        debug!("💳️ Creating checkout session for order {order_id}");
        let call = self.provider.create_checkout_session(request);
        let session = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!("💳️ Could not create checkout session for order {order_id}: {e}");
                return Err(e.into());
            },
            Err(_) => {
                let secs = self.config.timeout.as_secs();
                warn!("💳️ Checkout session for order {order_id} timed out after {secs}s");
                return Err(PaymentProviderError::Timeout(secs).into());
            },
        };
        let updated = self
            .db
            .save_checkout_session(&order_id, &session.session_id, session.payment_intent_id.as_deref())
            .await?;
        let Some(updated) = updated else {
            let current = self.db.fetch_order(&order_id).await?.map(|o| o.status).unwrap_or(order.status);
            warn!("💳️ Order {order_id} became {current} while its checkout session was being created");
            return Err(ShopError::OrderNotPayable(order_id, current));
        };
        if let Some(old) = &order.checkout_session_id {
            info!("💳️ Checkout session {} supersedes {old} for order {order_id}", session.session_id);
        } else {
            info!("💳️ Checkout session {} created for order {order_id}", session.session_id);
        }
        Ok(CheckoutSession { session_id: session.session_id, redirect_url: session.url, order: updated })
    }
}
