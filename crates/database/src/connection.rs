use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Establishes a connection pool to the SQLite database named in `settings`.
///
/// The database file is created when missing. An in-memory URL is pinned to a
/// single connection that is never recycled, since each SQLite connection
/// would otherwise see its own empty database.
pub async fn connect(settings: &DatabaseSettings) -> Result<SqlitePool, DbError> {
    if settings.url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError(
            "database.url must be set.".to_string(),
        ));
    }

    let in_memory = settings.url.contains(":memory:");
    let mut options = SqliteConnectOptions::from_str(&settings.url)?
        .create_if_missing(true)
        .foreign_keys(true);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool = SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(5));
    pool = if in_memory {
        pool.max_connections(1).idle_timeout(None).max_lifetime(None)
    } else {
        pool.max_connections(settings.max_connections)
    };

    let pool = pool.connect_with(options).await?;
    tracing::info!(url = %settings.url, in_memory, "Connected to the user database.");
    Ok(pool)
}

/// Applies the embedded migrations so the schema is up-to-date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
