//! Database schema migrations
//!
//! Version 1 is the schema `create_schema` builds. Later schema changes are
//! added here as numbered migrations so that databases created at an older
//! version pick them up on startup. `create_schema` always builds the latest
//! layout for fresh databases, so every migration must be idempotent: it
//! checks before it alters.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify a released migration** - add a new one instead
//! 2. **One function per schema change**
//! 3. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
///
/// Expects `create_schema` to have run first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        set_schema_version(pool, 1).await?;
        info!("✓ Schema v1 recorded");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_version_zero_without_table() {
        let pool = bare_pool().await;
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fresh_schema_is_recorded_as_current_version() {
        let pool = bare_pool().await;
        crate::db::create_schema(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), 0);

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_newer_database_version_is_left_alone() {
        let pool = crate::db::init_memory_database().await.unwrap();
        set_schema_version(&pool, CURRENT_SCHEMA_VERSION + 1).await.unwrap();

        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION + 1);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = crate::db::init_memory_database().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
