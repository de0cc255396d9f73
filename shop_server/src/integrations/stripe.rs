//! Adapts the Stripe client to the engine's payment provider contracts.
//!
//! Checkout sessions carry the order and user ids as metadata, on the session itself and on its payment intent, so
//! that every event Stripe sends back can be correlated to an order.
use std::collections::BTreeMap;

use log::*;
use shop_engine::{
    db_types::{OrderId, UserId},
    payment_objects::{CheckoutRequest, PaymentEvent, PaymentEventKind, ProviderSession},
    traits::{PaymentProviderError, WebhookError},
    PaymentProvider,
    WebhookVerifier,
};
use stripe_tools::{
    NewCheckoutSession,
    NewLineItem,
    SignatureError,
    StripeApi,
    StripeApiError,
    StripeConfig,
    StripeEvent,
    METADATA_ORDER_ID,
    METADATA_USER_ID,
};

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
pub const ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Clone)]
pub struct StripeProvider {
    api: StripeApi,
}

impl StripeProvider {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let api = StripeApi::new(config)?;
        Ok(Self { api })
    }

    pub fn api(&self) -> &StripeApi {
        &self.api
    }

    fn provider_error(&self, e: StripeApiError) -> PaymentProviderError {
        match e {
            StripeApiError::Timeout => PaymentProviderError::Timeout(self.api.config().timeout.as_secs()),
            StripeApiError::JsonError(s) => PaymentProviderError::InvalidResponse(s),
            e if e.is_rejection() => PaymentProviderError::Rejected(e.to_string()),
            e => PaymentProviderError::Transport(e.to_string()),
        }
    }
}

pub fn new_checkout_session(request: CheckoutRequest) -> NewCheckoutSession {
    let mut metadata = BTreeMap::new();
    metadata.insert(METADATA_ORDER_ID.to_string(), request.order_id.as_str().to_string());
    metadata.insert(METADATA_USER_ID.to_string(), request.user_id.as_str().to_string());
    let line_items = request
        .line_items
        .into_iter()
        .map(|l| NewLineItem {
            name: l.name,
            images: l.image.into_iter().collect(),
            unit_amount: l.unit_amount.value(),
            quantity: l.quantity,
        })
        .collect();
    NewCheckoutSession {
        currency: request.currency,
        line_items,
        success_url: request.success_url,
        cancel_url: request.cancel_url,
        client_reference_id: Some(request.order_id.as_str().to_string()),
        metadata,
    }
}

impl PaymentProvider for StripeProvider {
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<ProviderSession, PaymentProviderError> {
        let session = new_checkout_session(request);
        let result = self.api.create_checkout_session(&session).await.map_err(|e| self.provider_error(e))?;
        Ok(ProviderSession { session_id: result.id, url: result.url, payment_intent_id: result.payment_intent })
    }
}

impl WebhookVerifier for StripeProvider {
    fn verify_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, WebhookError> {
        let event = self.api.verify_webhook(payload, signature).map_err(|e| match e {
            SignatureError::InvalidPayload(s) => WebhookError::MalformedPayload(s),
            e => WebhookError::InvalidSignature(e.to_string()),
        })?;
        payment_event_from_stripe(event)
    }
}

/// Maps a verified Stripe event onto the engine's payment event.
///
/// A completed checkout session only counts as a successful payment once Stripe reports it as paid. Sessions paid
/// with delayed methods are reported later, through `checkout.session.async_payment_succeeded`.
pub fn payment_event_from_stripe(event: StripeEvent) -> Result<PaymentEvent, WebhookError> {
    let malformed = |e: StripeApiError| WebhookError::MalformedPayload(e.to_string());
    let result = match event.event_type.as_str() {
        CHECKOUT_COMPLETED | ASYNC_PAYMENT_SUCCEEDED | ASYNC_PAYMENT_FAILED => {
            let session = event.checkout_session().map_err(malformed)?;
            let kind = match event.event_type.as_str() {
                ASYNC_PAYMENT_FAILED => PaymentEventKind::PaymentFailed,
                _ if session.is_paid() => PaymentEventKind::PaymentSucceeded,
                _ => {
                    debug!("💳️ Checkout session {} completed, but is not paid yet", session.id);
                    PaymentEventKind::Other
                },
            };
            let mut result = PaymentEvent::new(event.event_type.clone(), kind).with_session_id(session.id.clone());
            result.order_id = session.order_id().map(OrderId::from);
            result.user_id = session.user_id().map(UserId::from);
            result.payment_intent_id = session.payment_intent.clone();
            result
        },
        PAYMENT_INTENT_FAILED => {
            let intent = event.payment_intent().map_err(malformed)?;
            let mut result = PaymentEvent::new(event.event_type.clone(), PaymentEventKind::PaymentFailed)
                .with_payment_intent(intent.id.clone());
            result.order_id = intent.order_id().map(OrderId::from);
            result.user_id = intent.user_id().map(UserId::from);
            result
        },
        other => PaymentEvent::new(other, PaymentEventKind::Other),
    };
    Ok(result.with_event_id(event.id))
}
