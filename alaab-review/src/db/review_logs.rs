//! Append-only review audit trail

use alaab_common::db::{ReviewAction, ReviewLog};
use alaab_common::{time, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::parse_guid;

/// Append an audit entry, returning its row id
pub async fn append(
    conn: &mut SqliteConnection,
    game_id: Uuid,
    reviewer_id: Uuid,
    action: ReviewAction,
    notes: Option<&str>,
    created_at: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO review_logs (game_id, reviewer_id, action, notes, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(game_id.to_string())
    .bind(reviewer_id.to_string())
    .bind(action.as_str())
    .bind(notes)
    .bind(created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Audit entries of a game in insertion order
pub async fn list_for_game(pool: &SqlitePool, game_id: Uuid) -> Result<Vec<ReviewLog>> {
    let rows = sqlx::query(
        "SELECT id, game_id, reviewer_id, action, notes, created_at FROM review_logs \
         WHERE game_id = ? ORDER BY id",
    )
    .bind(game_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let game_id: String = row.get("game_id");
            let reviewer_id: String = row.get("reviewer_id");
            let action: String = row.get("action");
            let created_at: String = row.get("created_at");
            Ok(ReviewLog {
                id: row.get("id"),
                game_id: parse_guid(&game_id)?,
                reviewer_id: parse_guid(&reviewer_id)?,
                action: action.parse()?,
                notes: row.get("notes"),
                created_at: time::from_db(&created_at)?,
            })
        })
        .collect()
}
