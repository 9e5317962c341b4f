//! SQLite connection pool
//!
//! The pool holds exactly one connection: every catalog operation is
//! serialized at `pool.get()`, whatever the parallelism of the caller.

use crate::Result;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

const MAX_CONNECTIONS: u32 = 1;
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Initialize the SQLite connection pool for a database file
pub fn init_pool(path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        Ok(())
    });

    build(manager)
}

/// In-memory catalog; the single connection keeps the database alive
pub fn init_memory_pool() -> Result<DbPool> {
    build(SqliteConnectionManager::memory())
}

fn build(manager: SqliteConnectionManager) -> Result<DbPool> {
    Ok(Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .min_idle(Some(MAX_CONNECTIONS))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)?)
}
