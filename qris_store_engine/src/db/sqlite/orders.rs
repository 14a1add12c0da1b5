use chrono::{DateTime, Utc};
use log::{debug, trace};
use qris_common::Rupiah;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, NewOrderLine, Order, OrderId, OrderLine, PaymentStatus};

/// Inserts the order row, without its lines. This is not atomic. Embed the call in a transaction, and pass `&mut tx`
/// as the connection, when the lines must be written together with it.
pub async fn insert_order(
    order: &NewOrder,
    total: Rupiah,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                buyer_id,
                total_amount,
                status,
                qris_payload,
                qris_expiry,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.buyer_id)
    .bind(total)
    .bind(PaymentStatus::Pending)
    .bind(&order.qris_payload)
    .bind(order.qris_expiry)
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn insert_line(
    order_id: &OrderId,
    line: &NewOrderLine,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    let line = sqlx::query_as(
        r#"
            INSERT INTO order_lines (order_id, product_id, product_name, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(line.product_id)
    .bind(&line.product_name)
    .bind(line.quantity)
    .bind(line.unit_price)
    .fetch_one(conn)
    .await?;
    Ok(line)
}

pub async fn fetch_lines(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// Fills in the lines of an order fetched without them.
pub async fn with_lines(mut order: Order, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    order.lines = fetch_lines(&order.order_id, conn).await?;
    Ok(order)
}

async fn with_lines_all(orders: Vec<Order>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
        result.push(with_lines(order, &mut *conn).await?);
    }
    Ok(result)
}

/// Returns the order with the given `order_id`, including its lines.
pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    match order {
        Some(order) => Ok(Some(with_lines(order, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_orders_for_buyer(buyer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(buyer_id)
        .fetch_all(&mut *conn)
        .await?;
    with_lines_all(orders, conn).await
}

/// Compare-and-set on the order status. The order moves from `from` to `to` only if its status is still `from`.
///
/// Returns the updated order (without lines), or `None` if the order does not exist or its status was not `from`.
pub async fn transition_status(
    order_id: &OrderId,
    from: PaymentStatus,
    to: PaymentStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let completed_at = matches!(to, PaymentStatus::Paid).then_some(now);
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = $1, updated_at = $2, completed_at = COALESCE($3, completed_at)
        WHERE order_id = $4 AND status = $5
        RETURNING *;
        "#,
    )
    .bind(to)
    .bind(now)
    .bind(completed_at)
    .bind(order_id.as_str())
    .bind(from)
    .fetch_optional(conn)
    .await?;
    match &order {
        Some(_) => debug!("📝️ Order {order_id} moved from {from} to {to}"),
        None => trace!("📝️ Order {order_id} was not {from}. Status left unchanged"),
    }
    Ok(order)
}

pub async fn fetch_expired_pending(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = $1 AND qris_expiry IS NOT NULL AND qris_expiry <= $2
        ORDER BY qris_expiry ASC, id ASC
        "#,
    )
    .bind(PaymentStatus::Pending)
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;
    with_lines_all(orders, conn).await
}

pub async fn fetch_unreported_paid(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE status = $1 AND admin_notified_at IS NULL ORDER BY completed_at ASC, id ASC",
    )
    .bind(PaymentStatus::Paid)
    .fetch_all(&mut *conn)
    .await?;
    with_lines_all(orders, conn).await
}

/// Sets `admin_notified_at` if it is not set yet. Returns `true` if this call set it.
pub async fn claim_admin_notification(
    order_id: &OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let claimed = sqlx::query(
        "UPDATE orders SET admin_notified_at = $1 WHERE order_id = $2 AND status = $3 AND admin_notified_at IS NULL",
    )
    .bind(now)
    .bind(order_id.as_str())
    .bind(PaymentStatus::Paid)
    .execute(conn)
    .await?
    .rows_affected();
    Ok(claimed == 1)
}
