use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::any::AnyPoolOptions;
use sqlx::{any::AnyConnectOptions, migrate::Migrator, AnyPool, ConnectOptions};
use std::sync::Once;
use std::{path::PathBuf, str::FromStr};

use crate::storage::Storage;

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

// Embed SQL migrations from the migrations/ directory
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Persistent cache store backed by sqlx (SQLite by default).
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Open a connection pool. With no URL configured, the cache lives in a
    /// SQLite file under the user's data directory.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?
            // Every cache hit is a statement; logging them drowns out the
            // pipeline's own debug output.
            .disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.context("running migrations")
    }
}

#[async_trait::async_trait]
impl Storage for Database {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT payload FROM search_cache WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO search_cache(key, payload, expires_at) VALUES (?, ?, ?)\n             ON CONFLICT(key) DO UPDATE SET payload=excluded.payload, expires_at=excluded.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let result = if let Some(p) = prefix {
            let like = format!("{}%", p);
            sqlx::query("DELETE FROM search_cache WHERE key LIKE ?")
                .bind(like)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM search_cache")
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected())
    }

    async fn cache_counts(&self, now: i64) -> Result<(u64, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_cache")
            .fetch_one(&self.pool)
            .await?;
        let expired: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM search_cache WHERE expires_at <= ?")
                .bind(now)
                .fetch_one(&self.pool)
                .await?;
        Ok((total as u64, expired as u64))
    }
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("dev", "multiverse", "multiverse")
        .context("no usable data directory for the default cache database")?;
    let dir = proj.data_dir();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating data dir: {}", dir.display()))?;
    let path: PathBuf = dir.join("multiverse.db");

    // mode=rwc lets SQLite create the file on first open; spaces must be
    // percent-encoded for the URL parser.
    let path_str = path.to_string_lossy().replace(' ', "%20");
    Ok(format!("sqlite:///{path_str}?mode=rwc"))
}
