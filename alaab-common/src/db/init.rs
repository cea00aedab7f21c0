//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas and
//! brings the schema up to date. Every step is idempotent.

use crate::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas go on the connect options so every pooled
    // connection gets them
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Single connection, so every query sees the same memory database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create every table and index (no-op for ones that already exist)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_users_table(pool).await?;

    // Reference data
    create_countries_table(pool).await?;
    create_heritage_fields_table(pool).await?;
    create_tags_table(pool).await?;

    create_games_table(pool).await?;
    create_game_tags_table(pool).await?;

    // Review subsystem
    create_game_concepts_table(pool).await?;
    create_game_concept_members_table(pool).await?;
    create_game_similarities_table(pool).await?;
    create_review_logs_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the users table
///
/// Identity is owned by the surrounding web application; this table is the
/// lookup the review core consumes (id, display name, role).
pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('editor', 'reviewer', 'admin')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_countries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS countries (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            name_en TEXT,
            region TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_heritage_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS heritage_fields (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            name_en TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the games table
///
/// List-valued attributes (local names, rules, tools) are JSON arrays.
async fn create_games_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            guid TEXT PRIMARY KEY,
            canonical_name TEXT NOT NULL,
            local_names TEXT NOT NULL DEFAULT '[]',
            country_id TEXT NOT NULL REFERENCES countries(guid),
            heritage_field_id TEXT NOT NULL REFERENCES heritage_fields(guid),
            description TEXT NOT NULL DEFAULT '',
            rules TEXT NOT NULL DEFAULT '[]',
            tools TEXT NOT NULL DEFAULT '[]',
            player_count TEXT,
            age_group TEXT,
            review_status TEXT NOT NULL DEFAULT 'draft'
                CHECK (review_status IN ('draft', 'under_review', 'published', 'rejected', 'archived')),
            contributor_id TEXT NOT NULL REFERENCES users(guid),
            reviewer_id TEXT REFERENCES users(guid),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            published_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_review_status ON games(review_status)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_game_tags_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_tags (
            game_id TEXT NOT NULL REFERENCES games(guid) ON DELETE CASCADE,
            tag_id TEXT NOT NULL REFERENCES tags(guid) ON DELETE CASCADE,
            PRIMARY KEY (game_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_game_concepts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_concepts (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            canonical_game_id TEXT REFERENCES games(guid) ON DELETE SET NULL,
            created_by TEXT NOT NULL REFERENCES users(guid),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_game_concept_members_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_concept_members (
            concept_id TEXT NOT NULL REFERENCES game_concepts(guid) ON DELETE CASCADE,
            game_id TEXT NOT NULL REFERENCES games(guid) ON DELETE CASCADE,
            added_at TEXT NOT NULL,
            PRIMARY KEY (concept_id, game_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the game_similarities table
///
/// Pairs are stored canonically (`game_a_id < game_b_id`). The partial
/// unique index allows at most one active record per pair while keeping any
/// number of rejected ones as history.
async fn create_game_similarities_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_similarities (
            guid TEXT PRIMARY KEY,
            game_a_id TEXT NOT NULL REFERENCES games(guid) ON DELETE CASCADE,
            game_b_id TEXT NOT NULL REFERENCES games(guid) ON DELETE CASCADE,
            structural_score REAL NOT NULL CHECK (structural_score BETWEEN 0.0 AND 1.0),
            semantic_score REAL NOT NULL CHECK (semantic_score BETWEEN 0.0 AND 1.0),
            heritage_score REAL NOT NULL CHECK (heritage_score BETWEEN 0.0 AND 1.0),
            overall_score REAL NOT NULL CHECK (overall_score BETWEEN 0.0 AND 1.0),
            algorithm TEXT NOT NULL,
            ai_assisted INTEGER NOT NULL DEFAULT 0,
            explanation TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'accepted', 'rejected', 'postponed')),
            concept_id TEXT REFERENCES game_concepts(guid) ON DELETE SET NULL,
            reviewer_id TEXT REFERENCES users(guid),
            review_notes TEXT,
            created_at TEXT NOT NULL,
            reviewed_at TEXT,
            CHECK (game_a_id < game_b_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_similarity_active_pair
        ON game_similarities(game_a_id, game_b_id)
        WHERE status IN ('pending', 'accepted', 'postponed')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_similarity_status ON game_similarities(status, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the review_logs table (append-only audit trail)
async fn create_review_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_id TEXT NOT NULL REFERENCES games(guid) ON DELETE CASCADE,
            reviewer_id TEXT NOT NULL REFERENCES users(guid),
            action TEXT NOT NULL
                CHECK (action IN ('created', 'updated', 'submitted', 'approved', 'rejected', 'published', 'archived')),
            notes TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_review_logs_game ON review_logs(game_id, id)")
        .execute(pool)
        .await?;

    Ok(())
}
