//! # Mesa server
//!
//! The HTTP surface for the Mesa marketplace engine. It is responsible for:
//! * Verifying bearer tokens and enforcing the role ACL on every `/api` route.
//! * Translating HTTP requests into [`mesa_engine::OrderFlowApi`] and [`mesa_engine::RatingApi`] calls.
//! * Serving live order notifications to partners over server-sent events.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod live;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
