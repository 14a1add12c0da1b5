use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewPaymentVerification, OrderId, PaymentVerification};

pub async fn insert_verification(
    verification: NewPaymentVerification,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PaymentVerification, sqlx::Error> {
    let verification = sqlx::query_as(
        r#"
            INSERT INTO payment_verifications (order_id, expected_amount, qris_payload, verification_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(verification.order_id.as_str())
    .bind(verification.expected_amount)
    .bind(verification.qris_payload)
    .bind(verification.verification_hash)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(verification)
}

pub async fn fetch_verification(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentVerification>, sqlx::Error> {
    let verification = sqlx::query_as("SELECT * FROM payment_verifications WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(verification)
}

/// Stamps the verification record of the order. The first stamp sticks.
pub async fn mark_verified(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payment_verifications SET verified_at = $1 WHERE order_id = $2 AND verified_at IS NULL")
        .bind(now)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
