use std::collections::HashMap;

use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, OwnerIdentity, RatingSummary},
    order_objects::OrderQueryFilter,
    traits::OrderApiError,
};

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let items: String = row.try_get("items")?;
        let items = serde_json::from_str(&items)
            .map_err(|e| sqlx::Error::ColumnDecode { index: "items".into(), source: Box::new(e) })?;
        Ok(Order {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            establishment_id: row.try_get("establishment_id")?,
            owner_identity: row.try_get("owner_identity")?,
            customer_id: row.try_get("customer_id")?,
            items,
            contact: row.try_get("contact")?,
            status: row.try_get("status")?,
            rating: row.try_get("rating")?,
            feedback: row.try_get("feedback")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            feedback_at: row.try_get("feedback_at")?,
        })
    }
}

/// Inserts a new order with a freshly assigned order id. Not atomic on its own; embed in a transaction and pass
/// `&mut *tx` if atomicity with other writes is needed.
pub async fn insert_order(
    order: NewOrder,
    owner: &OwnerIdentity,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderApiError> {
    let items = serde_json::to_string(&order.items)
        .map_err(|e| OrderApiError::DatabaseError(format!("Could not serialize order items: {e}")))?;
    let order_id = OrderId::random();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                establishment_id,
                owner_identity,
                customer_id,
                items,
                contact,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(order.establishment_id)
    .bind(owner)
    .bind(order.customer_id.trim())
    .bind(items)
    .bind(order.contact)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

/// Returns the order matching the given public `order_id`, if any.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.as_str().to_string());
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(owner) = query.owner_identity {
        where_clause.push("owner_identity = ");
        where_clause.push_bind_unseparated(owner.as_str().to_string());
    }
    if let Some(est) = query.establishment_id {
        where_clause.push("establishment_id = ");
        where_clause.push_bind_unseparated(est);
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().unwrap().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ search_orders returned {} order(s)", orders.len());
    Ok(orders)
}

/// Compare-and-swap status update: the write only lands if the stored status still equals `expected`. Returns
/// `None` when the guard fails.
pub async fn update_order_status(
    order_id: &OrderId,
    expected: OrderStatus,
    next: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2 AND status = $3 \
         RETURNING *",
    )
    .bind(next)
    .bind(order_id.as_str())
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

/// Conditional feedback write: only lands while the order is `served` and unrated. `rating` and `feedback_at` are
/// set in the same statement, which keeps the rating-iff-feedback_at invariant.
pub async fn apply_feedback(
    order_id: &OrderId,
    rating: i64,
    feedback: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let result: Option<Order> = sqlx::query_as(
        "UPDATE orders SET rating = $1, feedback = $2, feedback_at = CURRENT_TIMESTAMP, updated_at = \
         CURRENT_TIMESTAMP WHERE order_id = $3 AND status = 'served' AND rating IS NULL RETURNING *",
    )
    .bind(rating)
    .bind(feedback)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(result)
}

/// Per-establishment average rating and count over served, rated orders.
pub async fn aggregate_ratings(
    establishment_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<HashMap<String, RatingSummary>, sqlx::Error> {
    if establishment_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder = QueryBuilder::new(
        "SELECT establishment_id, AVG(CAST(rating AS REAL)) AS average, COUNT(*) AS count FROM orders WHERE status \
         = 'served' AND rating >= 1 AND establishment_id IN (",
    );
    let mut ids = builder.separated(", ");
    for id in establishment_ids {
        ids.push_bind(id);
    }
    builder.push(") GROUP BY establishment_id");
    let rows = builder.build().fetch_all(conn).await?;
    let mut result = HashMap::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("establishment_id")?;
        let average: f64 = row.try_get("average")?;
        let count: i64 = row.try_get("count")?;
        result.insert(id, RatingSummary { average, count });
    }
    Ok(result)
}
