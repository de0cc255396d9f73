//! Shop Engine
//!
//! The shop engine owns the order lifecycle of the storefront: freezing carts into orders, handing orders to the
//! payment provider, and reconciling inventory exactly once when the provider confirms payment asynchronously.
//!
//! The library is divided into the following sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). You
//!    should never need to call the backend directly. Use the public API objects instead. The data types used in
//!    the database are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@shop_api`]). Each API object wraps a backend and provides one slice of the
//!    functionality: the inventory ledger, cart snapshots, the order state machine, checkout session creation, and
//!    webhook reconciliation.
//!
//! The engine also publishes events ([`mod@events`]) when stock changes or orders change status. Publishers are
//! injected into the API objects, so the engine holds no global broadcaster.
pub mod db_types;
pub mod events;
pub mod shop_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use shop_api::{
    cart_api::CartApi,
    checkout_api::CheckoutApi,
    errors::ShopError,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_objects,
    pricing::{PricingPolicy, StandardPricing},
    reconciler_api::{ReconcilerApi, WebhookOutcome},
};
pub use traits::{
    CartManagement,
    InventoryManagement,
    OrderManagement,
    PaymentProvider,
    ShopDatabase,
    StoreError,
    WebhookLedger,
    WebhookVerifier,
};
