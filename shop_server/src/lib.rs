//! # Shop server
//! This module hosts the HTTP server for the shop engine. It is responsible for:
//! * Authenticating customers and administrators with bearer tokens.
//! * Exposing the cart, order and inventory operations of the engine.
//! * Creating Stripe checkout sessions, and listening for Stripe's payment webhooks.
//! * Streaming stock and order events to connected clients.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/events`: A server-sent events stream of stock and order updates.
//! * `/api/payments/webhook`: The Stripe webhook. Authenticated by Stripe's signature.
//! * `/api/...`: Everything else. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sse;

#[cfg(test)]
mod endpoint_tests;
