//! # SQLite backend
//!
//! [`SqliteDatabase`] implements the storage traits on top of a SQLite connection pool.
//!
//! The query modules contain "low-level" SQLite interactions, written as plain functions that accept a
//! `&mut SqliteConnection`. Callers can pass a pooled connection, or open a transaction and pass that instead when
//! several calls must succeed or fail together.
//!
//! SQLite allows a single writer at a time. Every write transaction here issues a write as its first statement, so
//! concurrent writers queue up on the database lock (bounded by the busy timeout) instead of failing when a read lock
//! cannot be upgraded.
use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

mod sqlite_impl;

pub mod accounts;
pub mod orders;
pub mod products;
pub mod verifications;

pub use sqlite_impl::SqliteDatabase;

use crate::db::DatabaseError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
