use std::fmt::Debug;

use log::*;
use tokio::sync::mpsc;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, Role},
    events::{EventProducers, LiveEvent, NewOrderEvent, OrderBroker, Subscription},
    order_objects::OrderQueryFilter,
    traits::{EstablishmentManagement, OrderApiError, OrderManagement},
};

/// Maximum accepted feedback length. Longer submissions are truncated rather than rejected.
pub const MAX_FEEDBACK_LEN: usize = 500;

/// `OrderFlowApi` is the primary API for the order lifecycle: it creates orders (and dispatches the live
/// notification to the owning partner), applies status transitions, and records customer feedback. Every mutating
/// call enforces the ownership predicates before touching the backend.
pub struct OrderFlowApi<B> {
    db: B,
    broker: OrderBroker,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, broker: OrderBroker, producers: EventProducers) -> Self {
        Self { db, broker, producers }
    }

    pub fn broker(&self) -> &OrderBroker {
        &self.broker
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + EstablishmentManagement
{
    /// Create a new order on behalf of a customer.
    ///
    /// The target establishment's owner identity is copied onto the order at this point; it becomes the broker
    /// routing key and the partner-side ownership key for the rest of the order's life. After the order is stored,
    /// a `new_order` event is fanned out to all of the owner's open live channels. That dispatch is
    /// fire-and-forget: creation succeeds and returns the order even when no channel is open.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, OrderApiError> {
        let establishment = self
            .db
            .fetch_establishment(&order.establishment_id)
            .await?
            .ok_or_else(|| OrderApiError::EstablishmentNotFound(order.establishment_id.clone()))?;
        let order = self.db.insert_order(order, &establishment.owner_identity).await?;
        debug!("🔄️📦️ Order [{}] created for establishment '{}'", order.order_id, establishment.id);
        self.broker.publish(&order.owner_identity, LiveEvent::new_order(&order));
        self.call_new_order_hook(&order).await;
        Ok(order)
    }

    async fn call_new_order_hook(&self, order: &Order) {
        for emitter in &self.producers.new_order_producer {
            trace!("🔄️📦️ Notifying new order hook subscribers");
            emitter.publish_event(NewOrderEvent::new(order.clone())).await;
        }
    }

    /// Change the status of an order on behalf of a partner.
    ///
    /// Legal transitions:
    ///
    /// | From \ To  | Processing | Served | Cancelled |
    /// |------------|------------|--------|-----------|
    /// | Pending    | Ok         | Ok     | Ok        |
    /// | Processing | Err        | Ok     | Ok        |
    /// | Served     | Err        | Err    | Err       |
    /// | Cancelled  | Err        | Err    | Err       |
    ///
    /// `Pending` is never a requestable target. The caller must be the partner whose profile email matches the
    /// order's owner identity, otherwise the call fails with `Forbidden`. The write itself is a compare-and-swap
    /// against the status read here, so of two racing transitions exactly one succeeds; the loser gets
    /// `InvalidTransition`. Transitions are not broadcast to customers; only order creation is broadcast to
    /// partners.
    pub async fn update_status(
        &self,
        partner_subject: &str,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
        self.check_partner_owns(partner_subject, &order).await?;
        let from = order.status;
        use OrderStatus::*;
        match (from, next) {
            (Pending, Processing | Served | Cancelled) | (Processing, Served | Cancelled) => {},
            (_, _) => return Err(OrderApiError::InvalidTransition { from, requested: next }),
        }
        let updated = self
            .db
            .update_order_status(order_id, from, next)
            .await?
            .ok_or(OrderApiError::InvalidTransition { from, requested: next })?;
        info!("🔄️📦️ Order [{order_id}] moved from {from} to {next}");
        Ok(updated)
    }

    /// Attach a rating and feedback text to a served order, on behalf of the customer who placed it.
    ///
    /// Ratings above 5 are clamped down to 5; ratings below 1 are rejected with `InvalidRating`. Feedback is
    /// truncated to [`MAX_FEEDBACK_LEN`] characters rather than rejected. The write only succeeds while the order
    /// is `Served` and unrated, and rating and `feedback_at` are set together, so an order is rated exactly once
    /// or not at all.
    pub async fn submit_feedback(
        &self,
        customer_subject: &str,
        order_id: &OrderId,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<Order, OrderApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
        check_customer_owns(customer_subject, &order)?;
        if order.status != OrderStatus::Served {
            return Err(OrderApiError::InvalidState { required: OrderStatus::Served, actual: order.status });
        }
        if order.rating.is_some() {
            return Err(OrderApiError::AlreadyRated(order_id.clone()));
        }
        let clamped = rating.min(5);
        if clamped < 1 {
            return Err(OrderApiError::InvalidRating(rating));
        }
        let feedback = feedback.map(|text| {
            if text.chars().count() > MAX_FEEDBACK_LEN {
                debug!("🔄️⭐️ Feedback for [{order_id}] truncated to {MAX_FEEDBACK_LEN} characters");
                text.chars().take(MAX_FEEDBACK_LEN).collect()
            } else {
                text
            }
        });
        match self.db.apply_feedback(order_id, clamped, feedback).await? {
            Some(order) => {
                info!("🔄️⭐️ Order [{order_id}] rated {clamped}");
                Ok(order)
            },
            None => {
                // Lost a race: re-read to report the reason the winner left behind.
                let now = self
                    .db
                    .fetch_order_by_order_id(order_id)
                    .await?
                    .ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
                if now.rating.is_some() {
                    Err(OrderApiError::AlreadyRated(order_id.clone()))
                } else {
                    Err(OrderApiError::InvalidState { required: OrderStatus::Served, actual: now.status })
                }
            },
        }
    }

    /// The order history for the calling customer.
    pub async fn my_orders(&self, customer_subject: &str) -> Result<Vec<Order>, OrderApiError> {
        let query = OrderQueryFilter::default().with_customer_id(customer_subject.trim());
        self.db.search_orders(query).await
    }

    /// All orders addressed to the calling partner's establishments.
    pub async fn orders_for_partner(&self, partner_subject: &str) -> Result<Vec<Order>, OrderApiError> {
        let owner = self
            .db
            .fetch_owner_identity_for_partner(partner_subject)
            .await?
            .ok_or_else(|| OrderApiError::Forbidden(format!("No partner profile for subject {partner_subject}")))?;
        let query = OrderQueryFilter::default().with_owner_identity(owner);
        self.db.search_orders(query).await
    }

    /// Fetch a single order, applying the ownership predicate for the caller's role: customers may only see orders
    /// they placed, partners only orders addressed to them.
    pub async fn fetch_order_for(
        &self,
        subject: &str,
        role: Role,
        order_id: &OrderId,
    ) -> Result<Order, OrderApiError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| OrderApiError::OrderNotFound(order_id.clone()))?;
        match role {
            Role::Customer => check_customer_owns(subject, &order)?,
            Role::Partner => self.check_partner_owns(subject, &order).await?,
        }
        Ok(order)
    }

    /// Register a live channel for a partner. Resolves the partner's owner identity and subscribes a fresh sink
    /// under it. The returned subscription unsubscribes on drop, and the receiver yields a `connected` ack
    /// followed by `new_order` events.
    pub async fn open_live_channel(
        &self,
        partner_subject: &str,
    ) -> Result<(Subscription, mpsc::UnboundedReceiver<LiveEvent>), OrderApiError> {
        let owner = self
            .db
            .fetch_owner_identity_for_partner(partner_subject)
            .await?
            .ok_or_else(|| OrderApiError::Forbidden(format!("No partner profile for subject {partner_subject}")))?;
        Ok(self.broker.subscribe(owner))
    }

    async fn check_partner_owns(&self, partner_subject: &str, order: &Order) -> Result<(), OrderApiError> {
        let owner = self
            .db
            .fetch_owner_identity_for_partner(partner_subject)
            .await?
            .ok_or_else(|| OrderApiError::Forbidden(format!("No partner profile for subject {partner_subject}")))?;
        if owner == order.owner_identity {
            Ok(())
        } else {
            Err(OrderApiError::Forbidden(format!("Order {} belongs to another partner", order.order_id)))
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

fn check_customer_owns(customer_subject: &str, order: &Order) -> Result<(), OrderApiError> {
    // Ids are canonical strings; trim both sides so equivalent representations compare equal.
    if order.customer_id.trim() == customer_subject.trim() {
        Ok(())
    } else {
        Err(OrderApiError::Forbidden(format!("Order {} belongs to another customer", order.order_id)))
    }
}
