//! # Mesa engine public API
//!
//! The pattern for using the APIs is the same across the module: an API instance is created by supplying a
//! database backend that implements the backend traits the API needs.
//!
//! * [`order_flow_api`] drives the order lifecycle: creation and live-notification dispatch, status transitions,
//!   and feedback submission, with the ownership guards baked in.
//! * [`rating_api`] computes the public per-establishment rating aggregates.

pub mod order_flow_api;
pub mod rating_api;
