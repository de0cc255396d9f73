//! A small client for the parts of the Stripe API the shop uses: hosted checkout sessions, and the events Stripe
//! sends back to the webhook endpoint.
mod api;
mod config;
mod data_objects;
mod error;
pub mod signature;

pub use api::StripeApi;
pub use config::StripeConfig;
pub use data_objects::{
    CheckoutSessionObject,
    NewCheckoutSession,
    NewLineItem,
    PaymentIntentObject,
    StripeEvent,
    StripeEventData,
    METADATA_ORDER_ID,
    METADATA_USER_ID,
};
pub use error::{SignatureError, StripeApiError};
