//! Process-local fixture backend.
//!
//! `MemoryDatabase` implements the same traits as [`crate::SqliteDatabase`] over lock-guarded maps. It exists for
//! tests and local fixtures; the adapter is selected once at startup, so engine code never knows which backend it
//! is talking to. The conditional-write semantics (status compare-and-swap, feedback-once) match the SQL adapter
//! exactly: both happen under a single write lock.
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use chrono::Utc;
use rand::Rng;

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

#[derive(Default)]
struct MemoryStore {
    orders: Vec<Order>,
    establishments: HashMap<String, Establishment>,
    partners: HashMap<String, OwnerIdentity>,
}

#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<RwLock<MemoryStore>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryStore) -> T) -> Result<T, OrderApiError> {
        let store = self.inner.read().map_err(|e| OrderApiError::DatabaseError(e.to_string()))?;
        Ok(f(&store))
    }

    fn write<T>(&self, f: impl FnOnce(&mut MemoryStore) -> T) -> Result<T, OrderApiError> {
        let mut store = self.inner.write().map_err(|e| OrderApiError::DatabaseError(e.to_string()))?;
        Ok(f(&mut store))
    }
}

fn matches_filter(order: &Order, query: &OrderQueryFilter) -> bool {
    if let Some(order_id) = &query.order_id {
        if &order.order_id != order_id {
            return false;
        }
    }
    if let Some(cid) = &query.customer_id {
        if &order.customer_id != cid {
            return false;
        }
    }
    if let Some(owner) = &query.owner_identity {
        if &order.owner_identity != owner {
            return false;
        }
    }
    if let Some(est) = &query.establishment_id {
        if &order.establishment_id != est {
            return false;
        }
    }
    if let Some(statuses) = &query.status {
        if !statuses.is_empty() && !statuses.contains(&order.status) {
            return false;
        }
    }
    if let Some(since) = &query.since {
        if order.created_at < *since {
            return false;
        }
    }
    if let Some(until) = &query.until {
        if order.created_at > *until {
            return false;
        }
    }
    true
}

impl OrderManagement for MemoryDatabase {
    async fn insert_order(&self, order: NewOrder, owner: &OwnerIdentity) -> Result<Order, OrderApiError> {
        let owner = owner.clone();
        self.write(move |store| {
            let now = Utc::now();
            let order = Order {
                id: store.orders.len() as i64 + 1,
                order_id: OrderId::random(),
                establishment_id: order.establishment_id,
                owner_identity: owner,
                customer_id: order.customer_id.trim().to_string(),
                items: order.items,
                contact: order.contact,
                status: OrderStatus::Pending,
                rating: None,
                feedback: None,
                created_at: now,
                updated_at: now,
                feedback_at: None,
            };
            store.orders.push(order.clone());
            order
        })
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderApiError> {
        self.read(|store| store.orders.iter().find(|o| &o.order_id == order_id).cloned())
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderApiError> {
        self.read(|store| {
            let mut orders: Vec<Order> =
                store.orders.iter().filter(|o| matches_filter(o, &query)).cloned().collect();
            orders.sort_by_key(|o| o.created_at);
            orders
        })
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<Order>, OrderApiError> {
        self.write(|store| {
            let order = store.orders.iter_mut().find(|o| &o.order_id == order_id)?;
            if order.status != expected {
                return None;
            }
            order.status = next;
            order.updated_at = Utc::now();
            Some(order.clone())
        })
    }

    async fn apply_feedback(
        &self,
        order_id: &OrderId,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<Option<Order>, OrderApiError> {
        self.write(|store| {
            let order = store.orders.iter_mut().find(|o| &o.order_id == order_id)?;
            if order.status != OrderStatus::Served || order.rating.is_some() {
                return None;
            }
            let now = Utc::now();
            order.rating = Some(rating);
            order.feedback = feedback;
            order.feedback_at = Some(now);
            order.updated_at = now;
            Some(order.clone())
        })
    }

    async fn aggregate_ratings(
        &self,
        establishment_ids: &[String],
    ) -> Result<HashMap<String, RatingSummary>, OrderApiError> {
        self.read(|store| {
            let mut sums: HashMap<String, (i64, i64)> = HashMap::new();
            for order in &store.orders {
                if order.status != OrderStatus::Served {
                    continue;
                }
                let Some(rating) = order.rating.filter(|r| *r >= 1) else { continue };
                if !establishment_ids.contains(&order.establishment_id) {
                    continue;
                }
                let entry = sums.entry(order.establishment_id.clone()).or_insert((0, 0));
                entry.0 += rating;
                entry.1 += 1;
            }
            sums.into_iter()
                .map(|(id, (total, count))| {
                    (id, RatingSummary { average: total as f64 / count as f64, count })
                })
                .collect()
        })
    }
}

impl EstablishmentManagement for MemoryDatabase {
    async fn insert_establishment(&self, establishment: NewEstablishment) -> Result<Establishment, OrderApiError> {
        self.write(|store| {
            let id = format!("est-{:08x}", rand::thread_rng().gen::<u32>());
            let establishment = Establishment {
                id: id.clone(),
                name: establishment.name,
                owner_identity: establishment.owner_identity,
                description: establishment.description,
                created_at: Utc::now(),
            };
            store.establishments.insert(id, establishment.clone());
            establishment
        })
    }

    async fn fetch_establishment(&self, id: &str) -> Result<Option<Establishment>, OrderApiError> {
        self.read(|store| store.establishments.get(id).cloned())
    }

    async fn upsert_partner(&self, subject_id: &str, email: &OwnerIdentity) -> Result<(), OrderApiError> {
        let email = email.clone();
        let subject_id = subject_id.trim().to_string();
        self.write(move |store| {
            store.partners.insert(subject_id, email);
        })
    }

    async fn fetch_owner_identity_for_partner(
        &self,
        subject_id: &str,
    ) -> Result<Option<OwnerIdentity>, OrderApiError> {
        self.read(|store| store.partners.get(subject_id.trim()).cloned())
    }
}

impl MarketplaceDatabase for MemoryDatabase {
    fn url(&self) -> &str {
        "memory://"
    }
}
