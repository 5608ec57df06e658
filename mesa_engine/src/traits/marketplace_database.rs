use std::collections::HashMap;

use thiserror::Error;

use crate::{
    db_types::{
        Establishment,
        NewEstablishment,
        NewOrder,
        Order,
        OrderId,
        OrderStatus,
        OwnerIdentity,
        RatingSummary,
    },
    order_objects::OrderQueryFilter,
};

/// Order persistence operations required by the engine.
///
/// The only write primitives are conditional: [`update_order_status`](OrderManagement::update_order_status) and
/// [`apply_feedback`](OrderManagement::apply_feedback) are read-modify-write operations guarded by the expected
/// current state, so that two racing mutations cannot both succeed.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Store a brand-new order. The `owner` is the identity copied from the target establishment; the backend
    /// persists it verbatim on the order record. Returns the stored record with its assigned ids and timestamps.
    async fn insert_order(&self, order: NewOrder, owner: &OwnerIdentity) -> Result<Order, OrderApiError>;

    /// Fetch an order by its public order id.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;

    /// Fetch orders matching the filter, ordered by `created_at` ascending.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError>;

    /// Compare-and-swap status update. The write only happens if the order's status still equals `expected` at
    /// write time. Returns `None` when the guard fails (the caller lost a race, or the state moved on), and the
    /// updated order otherwise.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<Order>, OrderApiError>;

    /// Conditional feedback write: sets `rating`, `feedback` and `feedback_at` in one step, only if the order is
    /// currently `Served` and has no rating yet. Returns `None` when the condition no longer holds. The rating
    /// must already be validated and clamped by the caller.
    async fn apply_feedback(
        &self,
        order_id: &OrderId,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<Option<Order>, OrderApiError>;

    /// Per-establishment `{average, count}` over served orders with a rating of at least 1. Establishments with
    /// no qualifying orders are simply absent from the result. Recomputed on every call; never cached.
    async fn aggregate_ratings(
        &self,
        establishment_ids: &[String],
    ) -> Result<HashMap<String, RatingSummary>, OrderApiError>;
}

/// Establishment and partner-profile persistence operations.
#[allow(async_fn_in_trait)]
pub trait EstablishmentManagement {
    /// Store a new establishment, assigning it an id. Mostly used by fixtures and seed tooling.
    async fn insert_establishment(&self, establishment: NewEstablishment) -> Result<Establishment, OrderApiError>;

    /// Fetch an establishment by id.
    async fn fetch_establishment(&self, id: &str) -> Result<Option<Establishment>, OrderApiError>;

    /// Create or update the partner profile row mapping an auth subject id to the partner's email identity.
    async fn upsert_partner(&self, subject_id: &str, email: &OwnerIdentity) -> Result<(), OrderApiError>;

    /// Resolve the owner identity (profile email) for an authenticated partner subject. This is the ownership key
    /// used by the authorization guard and as the broker routing key for live channels.
    async fn fetch_owner_identity_for_partner(&self, subject_id: &str) -> Result<Option<OwnerIdentity>, OrderApiError>;
}

/// The full backend contract: a cloneable handle offering both trait surfaces.
pub trait MarketplaceDatabase: Clone + OrderManagement + EstablishmentManagement {
    /// The URL of the backing store.
    fn url(&self) -> &str;
}

/// Alias for backends that provide both the order and the establishment surface, without requiring a cloneable
/// handle. Route handlers are generic over this bound.
pub trait OrderBackend: OrderManagement + EstablishmentManagement {}

impl<T: OrderManagement + EstablishmentManagement> OrderBackend for T {}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("The order backend is unavailable. {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Establishment {0} does not exist")]
    EstablishmentNotFound(String),
    #[error("Permission denied. {0}")]
    Forbidden(String),
    #[error("Illegal status transition from {from} to {requested}")]
    InvalidTransition { from: OrderStatus, requested: OrderStatus },
    #[error("The operation requires the order to be {required}, but it is {actual}")]
    InvalidState { required: OrderStatus, actual: OrderStatus },
    #[error("Order {0} has already been rated")]
    AlreadyRated(OrderId),
    #[error("Invalid rating value: {0}. Ratings must be 1 or greater")]
    InvalidRating(i64),
}

impl From<sqlx::Error> for OrderApiError {
    fn from(e: sqlx::Error) -> Self {
        OrderApiError::DatabaseError(e.to_string())
    }
}
