pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::AppError;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

/// Opens the connection pool, switches the database to WAL and applies
/// pending migrations. Called once at startup; the pool is then handed to
/// every component that needs storage.
pub fn init_pool(path: &str, max_size: u32, checkout_timeout: Duration) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;")
    });

    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .connection_timeout(checkout_timeout)
        .build(manager)
        .context("failed to open database pool")?;

    let mut conn = pool.get().context("failed to check out a database connection")?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .context("failed to set database pragmas")?;
    migrations::run_migrations(&mut conn)?;

    Ok(pool)
}

/// Checks out a connection and runs `f` on the blocking thread pool. A pool
/// checkout that times out surfaces as a storage error.
pub async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, AppError>
where
    F: FnOnce(&mut Connection) -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await?
}
