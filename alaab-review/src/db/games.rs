//! Game database operations
//!
//! Games keep their list-valued attributes (local names, rules, tools) as JSON
//! arrays in TEXT columns; tags live in the `game_tags` join table.

use alaab_common::db::{Game, ReviewStatus};
use alaab_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::{parse_guid, parse_guid_opt};
use crate::scoring::GameSnapshot;

const GAME_COLUMNS: &str = r#"
    guid, canonical_name, local_names, country_id, heritage_field_id,
    description, rules, tools, player_count, age_group, review_status,
    contributor_id, reviewer_id, created_at, updated_at, published_at
"#;

/// Insert a new game and its tags
pub async fn insert_game(conn: &mut SqliteConnection, game: &Game) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO games (
            guid, canonical_name, local_names, country_id, heritage_field_id,
            description, rules, tools, player_count, age_group, review_status,
            contributor_id, reviewer_id, created_at, updated_at, published_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(game.id.to_string())
    .bind(&game.canonical_name)
    .bind(serde_json::to_string(&game.local_names)?)
    .bind(game.country_id.to_string())
    .bind(game.heritage_field_id.to_string())
    .bind(&game.description)
    .bind(serde_json::to_string(&game.rules)?)
    .bind(serde_json::to_string(&game.tools)?)
    .bind(&game.player_count)
    .bind(&game.age_group)
    .bind(game.review_status.as_str())
    .bind(game.contributor_id.to_string())
    .bind(game.reviewer_id.map(|id| id.to_string()))
    .bind(time::to_db(&game.created_at))
    .bind(time::to_db(&game.updated_at))
    .bind(game.published_at.as_ref().map(time::to_db))
    .execute(&mut *conn)
    .await?;

    replace_game_tags(conn, game.id, &game.tag_ids).await
}

/// Overwrite the descriptive fields of a game and its tags
///
/// Workflow columns (status, reviewer, publication time) are untouched.
pub async fn update_game_content(conn: &mut SqliteConnection, game: &Game) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE games SET
            canonical_name = ?,
            local_names = ?,
            country_id = ?,
            heritage_field_id = ?,
            description = ?,
            rules = ?,
            tools = ?,
            player_count = ?,
            age_group = ?,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&game.canonical_name)
    .bind(serde_json::to_string(&game.local_names)?)
    .bind(game.country_id.to_string())
    .bind(game.heritage_field_id.to_string())
    .bind(&game.description)
    .bind(serde_json::to_string(&game.rules)?)
    .bind(serde_json::to_string(&game.tools)?)
    .bind(&game.player_count)
    .bind(&game.age_group)
    .bind(time::to_db(&game.updated_at))
    .bind(game.id.to_string())
    .execute(&mut *conn)
    .await?;

    replace_game_tags(conn, game.id, &game.tag_ids).await
}

async fn replace_game_tags(conn: &mut SqliteConnection, game_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
    sqlx::query("DELETE FROM game_tags WHERE game_id = ?")
        .bind(game_id.to_string())
        .execute(&mut *conn)
        .await?;

    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO game_tags (game_id, tag_id) VALUES (?, ?)")
            .bind(game_id.to_string())
            .bind(tag_id.to_string())
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Move a game from `from` to `to`
///
/// Returns false when the stored status is no longer `from` (a concurrent
/// transition won), so callers can report a conflict instead of overwriting.
pub async fn transition_status(
    conn: &mut SqliteConnection,
    game_id: Uuid,
    from: ReviewStatus,
    to: ReviewStatus,
    updated_at: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE games SET review_status = ?, updated_at = ? WHERE guid = ? AND review_status = ?",
    )
    .bind(to.as_str())
    .bind(updated_at)
    .bind(game_id.to_string())
    .bind(from.as_str())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Stamp approval: reviewer and publication time
pub async fn mark_published(
    conn: &mut SqliteConnection,
    game_id: Uuid,
    reviewer_id: Uuid,
    published_at: &str,
) -> Result<()> {
    sqlx::query("UPDATE games SET reviewer_id = ?, published_at = ? WHERE guid = ?")
        .bind(reviewer_id.to_string())
        .bind(published_at)
        .bind(game_id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Withdraw publication (revision back to draft)
pub async fn clear_published(conn: &mut SqliteConnection, game_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE games SET published_at = NULL WHERE guid = ?")
        .bind(game_id.to_string())
        .execute(conn)
        .await?;

    Ok(())
}

/// Load game by id
pub async fn load_game(conn: &mut SqliteConnection, game_id: Uuid) -> Result<Option<Game>> {
    let row = sqlx::query(&format!("SELECT {GAME_COLUMNS} FROM games WHERE guid = ?"))
        .bind(game_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => {
            let tag_ids = load_tag_ids(conn, game_id).await?;
            Ok(Some(game_from_row(&row, tag_ids)?))
        }
        None => Ok(None),
    }
}

/// Load review status only
pub async fn load_review_status(
    conn: &mut SqliteConnection,
    game_id: Uuid,
) -> Result<Option<(ReviewStatus, Uuid)>> {
    let row = sqlx::query("SELECT review_status, contributor_id FROM games WHERE guid = ?")
        .bind(game_id.to_string())
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => {
            let status: String = row.get("review_status");
            let contributor: String = row.get("contributor_id");
            Ok(Some((status.parse()?, parse_guid(&contributor)?)))
        }
        None => Ok(None),
    }
}

/// List published games, most recently published first
pub async fn list_published(pool: &SqlitePool) -> Result<Vec<Game>> {
    let rows = sqlx::query(&format!(
        "SELECT {GAME_COLUMNS} FROM games WHERE review_status = 'published' \
         ORDER BY published_at DESC, guid"
    ))
    .fetch_all(pool)
    .await?;

    let mut tags = load_tag_map(pool).await?;
    let mut games = Vec::with_capacity(rows.len());
    for row in &rows {
        let guid: String = row.get("guid");
        let tag_ids = tags
            .remove(&guid)
            .unwrap_or_default()
            .iter()
            .map(|id| parse_guid(id))
            .collect::<Result<Vec<_>>>()?;
        games.push(game_from_row(row, tag_ids)?);
    }

    Ok(games)
}

async fn load_tag_ids(conn: &mut SqliteConnection, game_id: Uuid) -> Result<Vec<Uuid>> {
    let rows = sqlx::query("SELECT tag_id FROM game_tags WHERE game_id = ? ORDER BY tag_id")
        .bind(game_id.to_string())
        .fetch_all(conn)
        .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("tag_id");
            parse_guid(&id)
        })
        .collect()
}

/// Tag ids of every game, keyed by stored game guid
async fn load_tag_map(pool: &SqlitePool) -> Result<HashMap<String, Vec<String>>> {
    let rows = sqlx::query("SELECT game_id, tag_id FROM game_tags ORDER BY game_id, tag_id")
        .fetch_all(pool)
        .await?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        map.entry(row.get("game_id"))
            .or_default()
            .push(row.get("tag_id"));
    }
    Ok(map)
}

fn game_from_row(row: &SqliteRow, tag_ids: Vec<Uuid>) -> Result<Game> {
    let guid: String = row.get("guid");
    let local_names: String = row.get("local_names");
    let country_id: String = row.get("country_id");
    let heritage_field_id: String = row.get("heritage_field_id");
    let rules: String = row.get("rules");
    let tools: String = row.get("tools");
    let review_status: String = row.get("review_status");
    let contributor_id: String = row.get("contributor_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Game {
        id: parse_guid(&guid)?,
        canonical_name: row.get("canonical_name"),
        local_names: serde_json::from_str(&local_names)?,
        country_id: parse_guid(&country_id)?,
        heritage_field_id: parse_guid(&heritage_field_id)?,
        description: row.get("description"),
        rules: serde_json::from_str(&rules)?,
        tools: serde_json::from_str(&tools)?,
        player_count: row.get("player_count"),
        age_group: row.get("age_group"),
        tag_ids,
        review_status: review_status.parse()?,
        contributor_id: parse_guid(&contributor_id)?,
        reviewer_id: parse_guid_opt(row.get("reviewer_id"))?,
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
        published_at: time::from_db_opt(row.get("published_at"))?,
    })
}

/// Raw scoring inputs of one game, before parsing
///
/// Kept unparsed so one corrupt row fails only its own pair during a
/// matching run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub guid: String,
    pub canonical_name: String,
    pub local_names: String,
    pub description: String,
    pub tools: String,
    pub player_count: Option<String>,
    pub country_id: String,
    pub region: Option<String>,
    pub heritage_field_id: String,
    pub review_status: String,
}

impl SnapshotRow {
    pub fn into_snapshot(self, tag_ids: &[String]) -> Result<GameSnapshot> {
        Ok(GameSnapshot {
            id: parse_guid(&self.guid)?,
            canonical_name: self.canonical_name,
            local_names: serde_json::from_str(&self.local_names)?,
            description: self.description,
            tools: serde_json::from_str(&self.tools)?,
            player_count: self.player_count,
            tag_ids: tag_ids.iter().map(|id| parse_guid(id)).collect::<Result<_>>()?,
            country_id: parse_guid(&self.country_id)?,
            region: self.region,
            heritage_field_id: parse_guid(&self.heritage_field_id)?,
        })
    }
}

const SNAPSHOT_SELECT: &str = r#"
    SELECT g.guid, g.canonical_name, g.local_names, g.description, g.tools,
           g.player_count, g.country_id, c.region, g.heritage_field_id,
           g.review_status
    FROM games g
    LEFT JOIN countries c ON c.guid = g.country_id
"#;

/// Scoring inputs for one game
pub async fn load_snapshot_row(pool: &SqlitePool, game_id: Uuid) -> Result<Option<SnapshotRow>> {
    let row = sqlx::query_as::<_, SnapshotRow>(&format!("{SNAPSHOT_SELECT} WHERE g.guid = ?"))
        .bind(game_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Scoring inputs for every non-archived game other than `exclude`
pub async fn load_candidate_rows(pool: &SqlitePool, exclude: Uuid) -> Result<Vec<SnapshotRow>> {
    let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
        "{SNAPSHOT_SELECT} WHERE g.guid != ? AND g.review_status != 'archived' ORDER BY g.guid"
    ))
    .bind(exclude.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Stored tag ids per game guid, for snapshot assembly
pub async fn load_snapshot_tags(pool: &SqlitePool) -> Result<HashMap<String, Vec<String>>> {
    load_tag_map(pool).await
}
