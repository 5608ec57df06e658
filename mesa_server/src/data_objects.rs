use mesa_engine::db_types::{LineItem, NewOrder, OrderStatus};
use serde::{Deserialize, Serialize};

/// Body for `POST /api/orders`. The customer id is taken from the access token, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub establishment_id: String,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub contact: Option<String>,
}

impl NewOrderRequest {
    pub fn into_new_order(self, customer_id: &str) -> NewOrder {
        let order = NewOrder::new(customer_id, self.establishment_id, self.items);
        match self.contact {
            Some(contact) => order.with_contact(contact),
            None => order,
        }
    }
}

/// Body for `POST /api/order/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Body for `POST /api/order/{id}/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub rating: i64,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Query string for `GET /ratings`: a comma-separated list of establishment ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingsQuery {
    pub ids: String,
}

impl RatingsQuery {
    pub fn establishment_ids(&self) -> Vec<String> {
        self.ids.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from).collect()
    }
}
