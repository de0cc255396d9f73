use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{CheckoutSessionObject, NewCheckoutSession},
    signature::verify_signature,
    SignatureError,
    StripeApiError,
    StripeEvent,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert("Stripe-Version", HeaderValue::from_static("2024-06-20"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base.trim_end_matches('/'))
    }

    /// Stripe takes form-encoded request bodies and answers in JSON.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("💳️ Sending Stripe request: POST {url}");
        let response = self.client.post(url).form(params).send().await.map_err(|e| {
            if e.is_timeout() {
                StripeApiError::Timeout
            } else {
                StripeApiError::RestRequestError(e.to_string())
            }
        })?;
        if response.status().is_success() {
            trace!("💳️ Stripe request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RestResponseError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    pub async fn create_checkout_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSessionObject, StripeApiError> {
        let params = session.to_form_params();
        debug!(
            "💳️ Creating Stripe checkout session with {} line items for {:?}",
            session.line_items.len(),
            session.client_reference_id
        );
        let result = self.post_form::<CheckoutSessionObject>("/checkout/sessions", &params).await?;
        info!("💳️ Stripe checkout session {} created", result.id);
        Ok(result)
    }

    /// Authenticates a webhook delivery against the configured signing secret and decodes it.
    pub fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<StripeEvent, SignatureError> {
        let now = chrono::Utc::now().timestamp();
        verify_signature(
            payload,
            signature,
            self.config.webhook_secret.reveal(),
            self.config.signature_tolerance,
            now,
        )?;
        StripeEvent::from_payload(payload).map_err(|e| SignatureError::InvalidPayload(e.to_string()))
    }
}
