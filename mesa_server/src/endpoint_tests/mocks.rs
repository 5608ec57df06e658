use std::collections::HashMap;

use mesa_engine::{
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
    traits::{EstablishmentManagement, OrderApiError, OrderManagement},
};
use mockall::mock;

mock! {
    pub MarketplaceBackend {}
    impl OrderManagement for MarketplaceBackend {
        async fn insert_order(&self, order: NewOrder, owner: &OwnerIdentity) -> Result<Order, OrderApiError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError>;
        async fn update_order_status(&self, order_id: &OrderId, expected: OrderStatus, next: OrderStatus) -> Result<Option<Order>, OrderApiError>;
        async fn apply_feedback(&self, order_id: &OrderId, rating: i64, feedback: Option<String>) -> Result<Option<Order>, OrderApiError>;
        async fn aggregate_ratings(&self, establishment_ids: &[String]) -> Result<HashMap<String, RatingSummary>, OrderApiError>;
    }
    impl EstablishmentManagement for MarketplaceBackend {
        async fn insert_establishment(&self, establishment: NewEstablishment) -> Result<Establishment, OrderApiError>;
        async fn fetch_establishment(&self, id: &str) -> Result<Option<Establishment>, OrderApiError>;
        async fn upsert_partner(&self, subject_id: &str, email: &OwnerIdentity) -> Result<(), OrderApiError>;
        async fn fetch_owner_identity_for_partner(&self, subject_id: &str) -> Result<Option<OwnerIdentity>, OrderApiError>;
    }
}
