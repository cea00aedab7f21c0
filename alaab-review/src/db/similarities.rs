//! Similarity record operations

use alaab_common::db::{GameSimilarity, MatchStatus, ReviewStatus};
use alaab_common::{time, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{parse_guid, parse_guid_opt};

const SIMILARITY_COLUMNS: &str = r#"
    s.guid, s.game_a_id, s.game_b_id, s.structural_score, s.semantic_score,
    s.heritage_score, s.overall_score, s.algorithm, s.ai_assisted, s.explanation,
    s.status, s.concept_id, s.reviewer_id, s.review_notes, s.created_at, s.reviewed_at
"#;

/// Insert a similarity unless the pair already has an active record
///
/// Returns false when the partial unique index swallowed the insert.
pub async fn insert_if_absent(pool: &SqlitePool, similarity: &GameSimilarity) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO game_similarities (
            guid, game_a_id, game_b_id, structural_score, semantic_score,
            heritage_score, overall_score, algorithm, ai_assisted, explanation,
            status, concept_id, reviewer_id, review_notes, created_at, reviewed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(similarity.id.to_string())
    .bind(similarity.game_a_id.to_string())
    .bind(similarity.game_b_id.to_string())
    .bind(similarity.structural_score)
    .bind(similarity.semantic_score)
    .bind(similarity.heritage_score)
    .bind(similarity.overall_score)
    .bind(&similarity.algorithm)
    .bind(similarity.ai_assisted)
    .bind(serde_json::to_string(&similarity.explanation)?)
    .bind(similarity.status.as_str())
    .bind(similarity.concept_id.map(|id| id.to_string()))
    .bind(similarity.reviewer_id.map(|id| id.to_string()))
    .bind(&similarity.review_notes)
    .bind(time::to_db(&similarity.created_at))
    .bind(similarity.reviewed_at.as_ref().map(time::to_db))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Whether the canonical pair has a pending, accepted or postponed record
pub async fn has_active_record(pool: &SqlitePool, game_a_id: Uuid, game_b_id: Uuid) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM game_similarities
            WHERE game_a_id = ? AND game_b_id = ?
              AND status IN ('pending', 'accepted', 'postponed')
        )
        "#,
    )
    .bind(game_a_id.to_string())
    .bind(game_b_id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Overall score of the most recent rejected record for the canonical pair
pub async fn latest_rejected_score(
    pool: &SqlitePool,
    game_a_id: Uuid,
    game_b_id: Uuid,
) -> Result<Option<f64>> {
    let score: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT overall_score FROM game_similarities
        WHERE game_a_id = ? AND game_b_id = ? AND status = 'rejected'
        ORDER BY reviewed_at DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(game_a_id.to_string())
    .bind(game_b_id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(score)
}

/// Load similarity by id
pub async fn load_similarity(
    conn: &mut SqliteConnection,
    similarity_id: Uuid,
) -> Result<Option<GameSimilarity>> {
    let row = sqlx::query(&format!(
        "SELECT {SIMILARITY_COLUMNS} FROM game_similarities s WHERE s.guid = ?"
    ))
    .bind(similarity_id.to_string())
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(similarity_from_row).transpose()
}

/// All records ever stored for a canonical pair, oldest first
pub async fn list_for_pair(
    pool: &SqlitePool,
    game_a_id: Uuid,
    game_b_id: Uuid,
) -> Result<Vec<GameSimilarity>> {
    let rows = sqlx::query(&format!(
        "SELECT {SIMILARITY_COLUMNS} FROM game_similarities s \
         WHERE s.game_a_id = ? AND s.game_b_id = ? ORDER BY s.created_at, s.guid"
    ))
    .bind(game_a_id.to_string())
    .bind(game_b_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(similarity_from_row).collect()
}

/// Decision written by a reviewer
pub struct Decision<'a> {
    pub status: MatchStatus,
    pub concept_id: Option<Uuid>,
    pub reviewer_id: Uuid,
    pub notes: Option<&'a str>,
    pub reviewed_at: &'a str,
}

/// Record a decision on a still-actionable similarity
///
/// Returns false when the record was already accepted or rejected.
pub async fn record_decision(
    conn: &mut SqliteConnection,
    similarity_id: Uuid,
    decision: &Decision<'_>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE game_similarities SET
            status = ?,
            concept_id = COALESCE(?, concept_id),
            reviewer_id = ?,
            review_notes = ?,
            reviewed_at = ?
        WHERE guid = ? AND status IN ('pending', 'postponed')
        "#,
    )
    .bind(decision.status.as_str())
    .bind(decision.concept_id.map(|id| id.to_string()))
    .bind(decision.reviewer_id.to_string())
    .bind(decision.notes)
    .bind(decision.reviewed_at)
    .bind(similarity_id.to_string())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Short description of one side of a queued match
#[derive(Debug, Clone, serde::Serialize)]
pub struct GameSummary {
    pub id: Uuid,
    pub canonical_name: String,
    pub country: String,
    pub heritage_field: String,
    pub review_status: ReviewStatus,
}

/// Actionable similarities joined with both game summaries, newest first
pub async fn list_actionable(
    pool: &SqlitePool,
) -> Result<Vec<(GameSimilarity, GameSummary, GameSummary)>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {SIMILARITY_COLUMNS},
               ga.canonical_name AS a_name, ca.name AS a_country,
               ha.name AS a_field, ga.review_status AS a_status,
               gb.canonical_name AS b_name, cb.name AS b_country,
               hb.name AS b_field, gb.review_status AS b_status
        FROM game_similarities s
        JOIN games ga ON ga.guid = s.game_a_id
        JOIN countries ca ON ca.guid = ga.country_id
        JOIN heritage_fields ha ON ha.guid = ga.heritage_field_id
        JOIN games gb ON gb.guid = s.game_b_id
        JOIN countries cb ON cb.guid = gb.country_id
        JOIN heritage_fields hb ON hb.guid = gb.heritage_field_id
        WHERE s.status IN ('pending', 'postponed')
        ORDER BY s.created_at DESC, s.guid DESC
        "#
    ))
    .fetch_all(pool)
    .await?;

    let mut queue = Vec::with_capacity(rows.len());
    for row in &rows {
        let similarity = similarity_from_row(row)?;
        let a_status: String = row.get("a_status");
        let b_status: String = row.get("b_status");
        let game_a = GameSummary {
            id: similarity.game_a_id,
            canonical_name: row.get("a_name"),
            country: row.get("a_country"),
            heritage_field: row.get("a_field"),
            review_status: a_status.parse()?,
        };
        let game_b = GameSummary {
            id: similarity.game_b_id,
            canonical_name: row.get("b_name"),
            country: row.get("b_country"),
            heritage_field: row.get("b_field"),
            review_status: b_status.parse()?,
        };
        queue.push((similarity, game_a, game_b));
    }

    Ok(queue)
}

/// Record count per status
pub async fn count_by_status(pool: &SqlitePool) -> Result<Vec<(MatchStatus, i64)>> {
    let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM game_similarities GROUP BY status")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let status: String = row.get("status");
            Ok((status.parse()?, row.get("n")))
        })
        .collect()
}

fn similarity_from_row(row: &SqliteRow) -> Result<GameSimilarity> {
    let guid: String = row.get("guid");
    let game_a_id: String = row.get("game_a_id");
    let game_b_id: String = row.get("game_b_id");
    let explanation: String = row.get("explanation");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(GameSimilarity {
        id: parse_guid(&guid)?,
        game_a_id: parse_guid(&game_a_id)?,
        game_b_id: parse_guid(&game_b_id)?,
        structural_score: row.get("structural_score"),
        semantic_score: row.get("semantic_score"),
        heritage_score: row.get("heritage_score"),
        overall_score: row.get("overall_score"),
        algorithm: row.get("algorithm"),
        ai_assisted: row.get("ai_assisted"),
        explanation: serde_json::from_str(&explanation)?,
        status: status.parse()?,
        concept_id: parse_guid_opt(row.get("concept_id"))?,
        reviewer_id: parse_guid_opt(row.get("reviewer_id"))?,
        review_notes: row.get("review_notes"),
        created_at: time::from_db(&created_at)?,
        reviewed_at: time::from_db_opt(row.get("reviewed_at"))?,
    })
}
