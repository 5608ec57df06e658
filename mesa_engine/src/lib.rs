//! Mesa Marketplace Engine
//!
//! The engine contains the core logic of the Mesa marketplace: the order lifecycle (state machine and ownership
//! guards), the live-notification broker that fans new-order events out to partners' open channels, and the
//! rating-aggregation pipeline that derives public reputation scores from completed orders.
//!
//! The library is divided into three main sections:
//! 1. Backend management ([`traits`], [`sqlite`], [`memory`]). Persistence is an external collaborator: the
//!    engine talks to it only through the traits in [`traits`]. SQLite is the durable adapter; the in-memory
//!    adapter serves fixtures and tests. Pick one at startup and hand it to the APIs.
//! 2. The engine public API ([`mod@api`]): [`OrderFlowApi`] for the order lifecycle and live channels, and
//!    [`RatingApi`] for public rating aggregates.
//! 3. The event layer ([`events`]): the [`OrderBroker`] connection registry plus a small hook system for
//!    best-effort side effects such as outbound mail.
mod api;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod order_objects;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    order_flow_api::{OrderFlowApi, MAX_FEEDBACK_LEN},
    rating_api::RatingApi,
};
pub use events::OrderBroker;
pub use memory::MemoryDatabase;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::OrderApiError;
