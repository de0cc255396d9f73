//! # Storage and provider contracts
//!
//! This module defines the interfaces that the engine's backends must implement.
//!
//! ## Storage
//! * [`InventoryManagement`] owns the per-product stock counters. Every stock change is a single atomic statement.
//! * [`CartManagement`] owns the live cart of each user.
//! * [`OrderManagement`] persists orders and applies status changes as compare-and-swap updates.
//! * [`WebhookLedger`] records processed payment-provider events, together with the status change they caused.
//! * [`ShopDatabase`] ties all of the above together into a single backend.
//!
//! ## Payment provider
//! * [`PaymentProvider`] creates hosted checkout sessions.
//! * [`WebhookVerifier`] authenticates and decodes inbound provider events.
mod cart_management;
mod data_objects;
mod inventory_management;
mod order_management;
mod payment_provider;
mod shop_database;
mod webhook_ledger;

pub use cart_management::CartManagement;
pub use data_objects::{LedgerEntry, LedgerOutcome, StatusChange, DEFAULT_CLAIM_TIMEOUT_SECS};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use payment_provider::{PaymentProvider, PaymentProviderError, WebhookError, WebhookVerifier};
pub use shop_database::{ShopDatabase, StoreError};
pub use webhook_ledger::WebhookLedger;
