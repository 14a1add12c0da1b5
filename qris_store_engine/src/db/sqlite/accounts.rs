use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::db_types::{DigitalAccount, NewDigitalAccount, OrderId, SoldAccountRecord};

pub async fn insert_account(
    account: NewDigitalAccount,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<DigitalAccount, sqlx::Error> {
    let account = sqlx::query_as(
        r#"
            INSERT INTO digital_accounts (product_id, content, content_kind, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(account.product_id)
    .bind(account.content)
    .bind(account.content_kind)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(account)
}

pub async fn count_available(product_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM digital_accounts WHERE product_id = $1 AND sold = 0")
        .bind(product_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Marks up to `quantity` of the oldest unsold units of the product as sold to the order, and returns them, oldest
/// first.
///
/// Selection and update happen in a single statement. Callers must check that the number of units returned is the
/// number they asked for.
pub async fn allocate_units(
    product_id: i64,
    quantity: i64,
    order_id: &OrderId,
    buyer_id: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<DigitalAccount>, sqlx::Error> {
    let mut units: Vec<DigitalAccount> = sqlx::query_as(
        r#"
        UPDATE digital_accounts
        SET sold = 1, sold_order_id = $1, sold_to = $2, sold_at = $3
        WHERE id IN (
            SELECT id FROM digital_accounts
            WHERE product_id = $4 AND sold = 0
            ORDER BY created_at ASC, id ASC
            LIMIT $5
        )
        RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(buyer_id)
    .bind(now)
    .bind(product_id)
    .bind(quantity)
    .fetch_all(conn)
    .await?;
    units.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    trace!("📦️ {} units of product #{product_id} allocated to order {order_id}", units.len());
    Ok(units)
}

pub async fn insert_sold_record(
    account: &DigitalAccount,
    order_id: &OrderId,
    buyer_id: &str,
    product_name: &str,
    sold_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<SoldAccountRecord, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
            INSERT INTO sold_accounts (
                account_id,
                order_id,
                buyer_id,
                product_id,
                product_name,
                content,
                content_kind,
                sold_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(account.id)
    .bind(order_id.as_str())
    .bind(buyer_id)
    .bind(account.product_id)
    .bind(product_name)
    .bind(&account.content)
    .bind(account.content_kind)
    .bind(sold_at)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

/// Puts every unit sold to the order back into the unsold pool and deletes the matching sold-account records.
/// Returns the number of units restored; zero if there was nothing to restore.
pub async fn restore_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let restored = sqlx::query(
        r#"
        UPDATE digital_accounts
        SET sold = 0, sold_order_id = NULL, sold_to = NULL, sold_at = NULL
        WHERE sold_order_id = $1 AND sold = 1
        "#,
    )
    .bind(order_id.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected();
    sqlx::query("DELETE FROM sold_accounts WHERE order_id = $1").bind(order_id.as_str()).execute(&mut *conn).await?;
    if restored > 0 {
        debug!("📦️ {restored} units from order {order_id} returned to stock");
    }
    Ok(restored)
}

pub async fn sold_records_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<SoldAccountRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM sold_accounts WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(records)
}
