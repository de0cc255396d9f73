use std::time::Duration;

use log::*;
use shop_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Stripe's own libraries reject events signed more than five minutes ago.
pub const DEFAULT_SIGNATURE_TOLERANCE: i64 = 300;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub timeout: Duration,
    /// Maximum age, in seconds, of a webhook signature.
    pub signature_tolerance: i64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            signature_tolerance: DEFAULT_SIGNATURE_TOLERANCE,
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_base = std::env::var("SHOP_STRIPE_API_BASE").unwrap_or_else(|_| {
            info!("🪛️ SHOP_STRIPE_API_BASE not set, using {DEFAULT_API_BASE}");
            DEFAULT_API_BASE.to_string()
        });
        let secret_key = Secret::new(std::env::var("SHOP_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("🪛️ SHOP_STRIPE_SECRET_KEY not set. Checkout sessions cannot be created.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("SHOP_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ SHOP_STRIPE_WEBHOOK_SECRET not set. Every webhook will be rejected.");
            String::default()
        }));
        let timeout = std::env::var("SHOP_STRIPE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SHOP_STRIPE_TIMEOUT_SECS value '{s}': {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let signature_tolerance = std::env::var("SHOP_STRIPE_SIGNATURE_TOLERANCE")
            .ok()
            .and_then(|s| {
                s.parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid SHOP_STRIPE_SIGNATURE_TOLERANCE value '{s}': {e}"))
                    .ok()
            })
            .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE);
        Self { api_base, secret_key, webhook_secret, timeout, signature_tolerance }
    }
}
