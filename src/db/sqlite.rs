use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::error::AppResult;

const MEMORY_URL: &str = "sqlite::memory:";

/// Creates the SQLite connection pool backing the vote ledger
///
/// Creates the database file (and its parent directory) when missing and
/// runs the embedded migrations. `sqlite::memory:` yields a single-connection
/// pool so every query sees the same in-memory database.
pub async fn create_pool(database_url: &str) -> AppResult<SqlitePool> {
    let pool = if database_url == MEMORY_URL {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(database_url)
            .await?
    } else {
        if let Some(parent) = sqlite_path(database_url).as_deref().and_then(Path::parent) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!(database_url = %database_url, "SQLite ledger connected and migrated");

    Ok(pool)
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == MEMORY_URL || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}
