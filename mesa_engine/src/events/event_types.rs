use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Events delivered over a partner's live channel. Serialized as-is onto the SSE wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// Acknowledgment sent to a single newly-registered sink, so the client can tell "registered" from "pending".
    Connected { timestamp: DateTime<Utc> },
    /// A new order has been placed against one of the partner's establishments.
    NewOrder { order_id: String, establishment_id: String, timestamp: DateTime<Utc> },
}

impl LiveEvent {
    pub fn connected() -> Self {
        Self::Connected { timestamp: Utc::now() }
    }

    pub fn new_order(order: &Order) -> Self {
        Self::NewOrder {
            order_id: order.order_id.as_str().to_string(),
            establishment_id: order.establishment_id.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Hook payload emitted after an order has been stored. Consumed by out-of-band side effects such as the
/// best-effort mail notifier.
#[derive(Debug, Clone)]
pub struct NewOrderEvent {
    pub order: Order,
}

impl NewOrderEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
