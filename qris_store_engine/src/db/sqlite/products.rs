use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, Product, StockLevel};

pub async fn insert_product(
    product: NewProduct,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, description, price, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products ORDER BY name").fetch_all(conn).await?;
    Ok(products)
}

/// Available, sold and total units of every active product, by product name.
pub async fn stock_levels(conn: &mut SqliteConnection) -> Result<Vec<StockLevel>, sqlx::Error> {
    let levels: Vec<StockLevel> = sqlx::query_as(
        r#"
        SELECT
            p.id AS product_id,
            p.name AS name,
            p.price AS price,
            COALESCE(SUM(CASE WHEN a.sold = 0 THEN 1 ELSE 0 END), 0) AS available,
            COALESCE(SUM(CASE WHEN a.sold = 1 THEN 1 ELSE 0 END), 0) AS sold,
            COUNT(a.id) AS total
        FROM products p
        LEFT JOIN digital_accounts a ON a.product_id = p.id
        WHERE p.is_active = 1
        GROUP BY p.id, p.name, p.price
        ORDER BY p.name
        "#,
    )
    .fetch_all(conn)
    .await?;
    trace!("📦️ Fetched stock levels for {} products", levels.len());
    Ok(levels)
}
