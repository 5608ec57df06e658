//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions, maintained as simple functions (rather than stateful
//! structs) that accept a `&mut SqliteConnection` argument. Callers obtain a connection from a pool, or create an
//! atomic transaction as the need arises and call through with `&mut *tx`.
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod establishments;
pub mod orders;

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
