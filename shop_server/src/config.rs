use std::{env, str::FromStr};

use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use shop_common::{helpers::parse_boolean_flag, Cents, Secret};
use shop_engine::{shop_api::checkout_api::CheckoutConfig, StandardPricing};
use stripe_tools::StripeConfig;

use crate::errors::ServerError;

const DEFAULT_SHOP_HOST: &str = "127.0.0.1";
const DEFAULT_SHOP_PORT: u16 = 5001;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/shop.db";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5001";
const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The storefront's base URL. Customers are sent back here from the hosted checkout page.
    pub frontend_url: String,
    pub pricing: StandardPricing,
    /// How many events a slow SSE subscriber may fall behind before it starts missing them.
    pub event_buffer: usize,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub stripe: StripeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SHOP_HOST.to_string(),
            port: DEFAULT_SHOP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            pricing: StandardPricing::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            use_x_forwarded_for: false,
            use_forwarded: false,
            stripe: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SHOP_HOST").ok().unwrap_or_else(|| DEFAULT_SHOP_HOST.into());
        let port = parse_env("SHOP_PORT", DEFAULT_SHOP_PORT);
        let database_url = env::var("SHOP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let frontend_url = env::var("SHOP_FRONTEND_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SHOP_FRONTEND_URL is not set. Checkout redirects will go to {DEFAULT_FRONTEND_URL}.");
            DEFAULT_FRONTEND_URL.to_string()
        });
        let defaults = StandardPricing::default();
        let pricing = StandardPricing {
            tax_rate_bps: parse_env("SHOP_TAX_RATE_BPS", defaults.tax_rate_bps),
            free_shipping_threshold: Cents::from(parse_env(
                "SHOP_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold.value(),
            )),
            flat_shipping: Cents::from(parse_env("SHOP_FLAT_SHIPPING", defaults.flat_shipping.value())),
        };
        let event_buffer = parse_env("SHOP_EVENT_BUFFER", DEFAULT_EVENT_BUFFER);
        let use_x_forwarded_for = parse_boolean_flag(env::var("SHOP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SHOP_USE_FORWARDED").ok(), false);
        let stripe = StripeConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            auth,
            frontend_url,
            pricing,
            event_buffer,
            use_x_forwarded_for,
            use_forwarded,
            stripe,
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig { frontend_url: self.frontend_url.clone(), timeout: self.stripe.timeout, ..Default::default() }
    }
}

/// Reads and parses the environment variable `name`. Missing or unparsable values fall back to `default`.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default, {default}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to sign and verify HS256 access tokens.
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every issued token becomes invalid when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()) }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("SHOP_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [SHOP_JWT_SECRET]")))?;
        if secret.trim().is_empty() {
            return Err(ServerError::ConfigurationError("SHOP_JWT_SECRET is empty".to_string()));
        }
        Ok(Self::new(secret))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that handlers need. Secrets are excluded so that they are not passed around
/// the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
