//! Connection pools
//!
//! Repositories and migrations hold a `DynDatabasePool`, branch on
//! `driver()` and borrow the concrete sqlx pool through `as_sqlite` or
//! `as_mysql`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// How long a writer waits on a locked SQLite file
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a single statement that returns no rows
    async fn execute(&self, sql: &str) -> Result<u64>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// SQLite database, file-backed or in memory.
///
/// Every pooled connection enforces foreign keys: translations, sessions and
/// assignments are removed through `ON DELETE CASCADE`.
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    pub async fn connect(location: &str) -> Result<Self> {
        let url = sqlite_url(location);
        let in_memory = url == SQLITE_MEMORY_URL;

        let mut options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid SQLite location: {}", location))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(SQLITE_BUSY_TIMEOUT);
        if !in_memory {
            ensure_parent_dir(&url)?;
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", location))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteBackend {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let done = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Statement failed: {}", sql.trim()))?;
        Ok(done.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MySqlBackend {
    async fn execute(&self, sql: &str) -> Result<u64> {
        let done = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Statement failed: {}", sql.trim()))?;
        Ok(done.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Open the database named by `database.driver` and `database.url`
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    Ok(match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteBackend::connect(&config.url).await?),
        DatabaseDriver::Mysql => Arc::new(MySqlBackend::connect(&config.url).await?),
    })
}

/// Empty in-memory SQLite database, shared by all of the pool's connections
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    Ok(Arc::new(SqliteBackend::connect(":memory:").await?))
}

/// `data/cliniclane.db` and `:memory:` become sqlx URLs; URLs pass through
fn sqlite_url(location: &str) -> String {
    if location == ":memory:" {
        SQLITE_MEMORY_URL.to_string()
    } else if location.starts_with("sqlite:") {
        location.to_string()
    } else {
        format!("sqlite:{}", location)
    }
}

fn ensure_parent_dir(url: &str) -> Result<()> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);

    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations;

    async fn count(pool: &DynDatabasePool, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
    }

    async fn migrated() -> DynDatabasePool {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_sqlite_url() {
        assert_eq!(sqlite_url(":memory:"), "sqlite::memory:");
        assert_eq!(sqlite_url("data/cliniclane.db"), "sqlite:data/cliniclane.db");
        assert_eq!(sqlite_url("sqlite:data/x.db?mode=ro"), "sqlite:data/x.db?mode=ro");
    }

    #[tokio::test]
    async fn test_file_database_created_with_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("cliniclane.db");

        let pool = create_pool(&DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: path.to_string_lossy().to_string(),
        })
        .await
        .unwrap();
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_mysql().is_none());
        assert!(path.exists());

        let mode = sqlx::query_scalar::<_, String>("PRAGMA journal_mode")
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[tokio::test]
    async fn test_deletes_cascade_to_translations_and_sessions() {
        let pool = migrated().await;
        for sql in [
            "INSERT INTO users (email, password_hash) VALUES ('editor@example.com', 'x')",
            "INSERT INTO sessions (id, user_id, expires_at) VALUES ('token', 1, '2030-01-01 00:00:00')",
            "INSERT INTO articles (slug, title) VALUES ('aspirin', 'Aspirin')",
            "INSERT INTO translations (article_id, language, title) VALUES (1, 'german', 'Aspirin DE')",
            "INSERT INTO user_articles (user_id, article_id) VALUES (1, 1)",
        ] {
            assert_eq!(pool.execute(sql).await.unwrap(), 1);
        }

        pool.execute("DELETE FROM articles WHERE id = 1").await.unwrap();
        assert_eq!(count(&pool, "translations").await, 0);
        assert_eq!(count(&pool, "user_articles").await, 0);
        assert_eq!(count(&pool, "sessions").await, 1);

        pool.execute("DELETE FROM users WHERE id = 1").await.unwrap();
        assert_eq!(count(&pool, "sessions").await, 0);
    }

    #[tokio::test]
    async fn test_every_connection_enforces_foreign_keys() {
        let pool = migrated().await;
        let sqlite = pool.as_sqlite().unwrap();

        // Concurrent statements check out several connections
        let results = futures::future::join_all((0..4).map(|i| {
            sqlx::query("INSERT INTO translations (article_id, language, title) VALUES (42, ?, 'x')")
                .bind(format!("lang{}", i))
                .execute(sqlite)
        }))
        .await;
        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(count(&pool, "translations").await, 0);
    }
}
