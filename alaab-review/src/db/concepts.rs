//! Game concept operations

use alaab_common::db::{GameConcept, ReviewStatus};
use alaab_common::{time, Result};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_guid, parse_guid_opt};

pub async fn insert_concept(conn: &mut SqliteConnection, concept: &GameConcept) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO game_concepts (guid, name, description, canonical_game_id, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(concept.id.to_string())
    .bind(&concept.name)
    .bind(&concept.description)
    .bind(concept.canonical_game_id.map(|id| id.to_string()))
    .bind(concept.created_by.to_string())
    .bind(time::to_db(&concept.created_at))
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn load_concept(conn: &mut SqliteConnection, concept_id: Uuid) -> Result<Option<GameConcept>> {
    let row = sqlx::query(
        "SELECT guid, name, description, canonical_game_id, created_by, created_at \
         FROM game_concepts WHERE guid = ?",
    )
    .bind(concept_id.to_string())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(concept_from_row).transpose()
}

/// Concept plus its member count
#[derive(Debug, Clone, Serialize)]
pub struct ConceptListing {
    #[serde(flatten)]
    pub concept: GameConcept,
    pub game_count: i64,
}

/// All concepts, newest first
pub async fn list_concepts(pool: &SqlitePool) -> Result<Vec<ConceptListing>> {
    let rows = sqlx::query(
        r#"
        SELECT c.guid, c.name, c.description, c.canonical_game_id, c.created_by, c.created_at,
               (SELECT COUNT(*) FROM game_concept_members m WHERE m.concept_id = c.guid) AS game_count
        FROM game_concepts c
        ORDER BY c.created_at DESC, c.guid
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(ConceptListing {
                concept: concept_from_row(row)?,
                game_count: row.get("game_count"),
            })
        })
        .collect()
}

/// Member game of a concept
#[derive(Debug, Clone, Serialize)]
pub struct ConceptMember {
    pub game_id: Uuid,
    pub canonical_name: String,
    pub country: String,
    pub review_status: ReviewStatus,
    pub added_at: chrono::DateTime<chrono::Utc>,
}

pub async fn list_members(pool: &SqlitePool, concept_id: Uuid) -> Result<Vec<ConceptMember>> {
    let rows = sqlx::query(
        r#"
        SELECT m.game_id, g.canonical_name, c.name AS country, g.review_status, m.added_at
        FROM game_concept_members m
        JOIN games g ON g.guid = m.game_id
        JOIN countries c ON c.guid = g.country_id
        WHERE m.concept_id = ?
        ORDER BY m.added_at, m.game_id
        "#,
    )
    .bind(concept_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let game_id: String = row.get("game_id");
            let status: String = row.get("review_status");
            let added_at: String = row.get("added_at");
            Ok(ConceptMember {
                game_id: parse_guid(&game_id)?,
                canonical_name: row.get("canonical_name"),
                country: row.get("country"),
                review_status: status.parse()?,
                added_at: time::from_db(&added_at)?,
            })
        })
        .collect()
}

/// Add a game to a concept; false if it was already a member
pub async fn add_member(
    conn: &mut SqliteConnection,
    concept_id: Uuid,
    game_id: Uuid,
    added_at: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO game_concept_members (concept_id, game_id, added_at) VALUES (?, ?, ?)",
    )
    .bind(concept_id.to_string())
    .bind(game_id.to_string())
    .bind(added_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove a game from a concept; false if it was not a member
///
/// Clears the concept's canonical game when that game is the one removed.
pub async fn remove_member(conn: &mut SqliteConnection, concept_id: Uuid, game_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM game_concept_members WHERE concept_id = ? AND game_id = ?")
        .bind(concept_id.to_string())
        .bind(game_id.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE game_concepts SET canonical_game_id = NULL WHERE guid = ? AND canonical_game_id = ?")
        .bind(concept_id.to_string())
        .bind(game_id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(true)
}

/// Delete a concept
///
/// Memberships cascade; similarities that pointed at it keep their decision
/// and lose the link.
pub async fn delete_concept(conn: &mut SqliteConnection, concept_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM game_concepts WHERE guid = ?")
        .bind(concept_id.to_string())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

fn concept_from_row(row: &SqliteRow) -> Result<GameConcept> {
    let guid: String = row.get("guid");
    let created_by: String = row.get("created_by");
    let created_at: String = row.get("created_at");

    Ok(GameConcept {
        id: parse_guid(&guid)?,
        name: row.get("name"),
        description: row.get("description"),
        canonical_game_id: parse_guid_opt(row.get("canonical_game_id"))?,
        created_by: parse_guid(&created_by)?,
        created_at: time::from_db(&created_at)?,
    })
}
