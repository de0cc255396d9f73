//! # Shop engine public API
//!
//! The `shop_api` module exposes the programmatic API of the engine. Each API object covers one component of the
//! order lifecycle:
//!
//! * [`inventory_api`] is the inventory ledger. It owns the stock counters and publishes a `StockChanged` event for
//!   every change.
//! * [`cart_api`] manages live carts and freezes them into line items when an order is placed.
//! * [`order_flow_api`] is the order state machine. It creates orders, enforces the legal transitions, and is the only
//!   part of the engine that changes an order's status.
//! * [`checkout_api`] turns an order into a hosted checkout session with the payment provider.
//! * [`reconciler_api`] consumes payment-provider webhooks and applies their effects at most once.
//!
//! # API usage
//!
//! Every API object is created from a database backend that implements the storage traits it needs, plus whatever
//! collaborators it requires (event publishers, a payment provider, a webhook verifier).
//!
//! ```rust,ignore
//! use shop_engine::{CartApi, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let carts = CartApi::new(db.clone());
//! let orders = OrderFlowApi::new(db, producers);
//! let items = carts.snapshot(&user_id).await?;
//! let order = orders.create_order(&user_id, items, address, "card").await?;
//! ```

pub mod cart_api;
pub mod checkout_api;
pub mod errors;
pub mod inventory_api;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_objects;
pub mod pricing;
pub mod reconciler_api;
