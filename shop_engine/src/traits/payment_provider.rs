use thiserror::Error;

use crate::payment_objects::{CheckoutRequest, PaymentEvent, ProviderSession};

/// A payment provider that hosts the checkout page.
#[allow(async_fn_in_trait)]
pub trait PaymentProvider {
    /// Creates a hosted checkout session for the request. Implementations must not retry on failure.
    async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<ProviderSession, PaymentProviderError>;
}

/// Authenticates and decodes the raw body of an inbound provider webhook.
pub trait WebhookVerifier {
    fn verify_event(&self, payload: &[u8], signature: &str) -> Result<PaymentEvent, WebhookError>;
}

#[derive(Debug, Clone, Error)]
pub enum PaymentProviderError {
    #[error("Could not reach the payment provider: {0}")]
    Transport(String),
    #[error("The payment provider rejected the request: {0}")]
    Rejected(String),
    #[error("The payment provider returned an unexpected response: {0}")]
    InvalidResponse(String),
    #[error("The payment provider did not respond within {0} seconds")]
    Timeout(u64),
}

#[derive(Debug, Clone, Error)]
pub enum WebhookError {
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Webhook payload could not be decoded: {0}")]
    MalformedPayload(String),
}
