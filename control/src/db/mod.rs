use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::PathBuf;
use tracing::info;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Initialize database with connection pool and run migrations
pub fn init_db(db_path: Option<PathBuf>) -> Result<DbPool> {
    let path = match db_path {
        Some(path) => path,
        None => default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    // every pooled connection needs foreign keys enabled, not just the first
    let manager = SqliteConnectionManager::file(&path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    let pool = Pool::builder()
        .max_size(10)
        .build(manager)
        .context("Failed to create connection pool")?;

    let conn = pool.get().context("Failed to get database connection")?;
    run_migrations(&conn)?;

    info!("Database initialized successfully");
    Ok(pool)
}

fn default_db_path() -> Result<PathBuf> {
    let mut path = dirs::data_local_dir().context("Cannot determine data directory")?;
    path.push("georep");
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Cannot create data directory {:?}", path))?;
    path.push("control.db");
    Ok(path)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    let migrations = [
        include_str!("../../migrations/001_inventory.sql"),
        include_str!("../../migrations/002_volumes.sql"),
    ];

    for (i, migration) in migrations.iter().enumerate() {
        info!("Running migration {}", i + 1);
        conn.execute_batch(migration)
            .with_context(|| format!("Failed to run migration {}", i + 1))?;
    }

    Ok(())
}

/// Helper for async database operations (spawn_blocking wrapper)
pub async fn execute_async<F, T>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().context("Failed to get database connection")?;
        f(&conn)
    })
    .await
    .context("Task join error")?
}
