//! `SqliteDatabase` is the durable backend for the Mesa engine. It implements all the traits defined in the
//! [`crate::traits`] module over a SQLite connection pool.
use std::{collections::HashMap, fmt::Debug};

use sqlx::SqlitePool;

use super::db::{establishments, new_pool, orders};
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
    traits::{EstablishmentManagement, MarketplaceDatabase, OrderApiError, OrderManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connect to the database at `url`, creating a pool with `max_connections` connections.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder, owner: &OwnerIdentity) -> Result<Order, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, owner, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_order_id(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(query, &mut conn).await?)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::update_order_status(order_id, expected, next, &mut conn).await?)
    }

    async fn apply_feedback(
        &self,
        order_id: &OrderId,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<Option<Order>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::apply_feedback(order_id, rating, feedback, &mut conn).await?)
    }

    async fn aggregate_ratings(
        &self,
        establishment_ids: &[String],
    ) -> Result<HashMap<String, RatingSummary>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::aggregate_ratings(establishment_ids, &mut conn).await?)
    }
}

impl EstablishmentManagement for SqliteDatabase {
    async fn insert_establishment(&self, establishment: NewEstablishment) -> Result<Establishment, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        establishments::insert_establishment(establishment, &mut conn).await
    }

    async fn fetch_establishment(&self, id: &str) -> Result<Option<Establishment>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(establishments::fetch_establishment(id, &mut conn).await?)
    }

    async fn upsert_partner(&self, subject_id: &str, email: &OwnerIdentity) -> Result<(), OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(establishments::upsert_partner(subject_id, email, &mut conn).await?)
    }

    async fn fetch_owner_identity_for_partner(
        &self,
        subject_id: &str,
    ) -> Result<Option<OwnerIdentity>, OrderApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(establishments::fetch_owner_identity_for_partner(subject_id, &mut conn).await?)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}
