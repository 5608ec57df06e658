use log::debug;
use rand::Rng;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Establishment, NewEstablishment, OwnerIdentity},
    traits::OrderApiError,
};

/// Inserts a new establishment with a freshly assigned id.
pub async fn insert_establishment(
    establishment: NewEstablishment,
    conn: &mut SqliteConnection,
) -> Result<Establishment, OrderApiError> {
    let id = format!("est-{:08x}", rand::thread_rng().gen::<u32>());
    let establishment: Establishment = sqlx::query_as(
        r#"
            INSERT INTO establishments (id, name, owner_identity, description)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(&id)
    .bind(establishment.name)
    .bind(establishment.owner_identity)
    .bind(establishment.description)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Establishment '{}' inserted as {id}", establishment.name);
    Ok(establishment)
}

pub async fn fetch_establishment(
    id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Establishment>, sqlx::Error> {
    let establishment =
        sqlx::query_as("SELECT * FROM establishments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(establishment)
}

/// Creates or replaces the partner-profile row linking an auth subject to the partner's email identity.
pub async fn upsert_partner(
    subject_id: &str,
    email: &OwnerIdentity,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO partners (subject_id, email) VALUES ($1, $2) ON CONFLICT (subject_id) DO UPDATE SET email = \
         excluded.email",
    )
    .bind(subject_id.trim())
    .bind(email)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_owner_identity_for_partner(
    subject_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OwnerIdentity>, sqlx::Error> {
    let email: Option<String> = sqlx::query_scalar("SELECT email FROM partners WHERE subject_id = $1")
        .bind(subject_id.trim())
        .fetch_optional(conn)
        .await?;
    Ok(email.map(OwnerIdentity::new))
}
