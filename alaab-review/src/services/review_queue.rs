//! Review queue and match decisions
//!
//! Reviewers work through pending and postponed similarities and decide each
//! one. Every decision writes its status change, concept links and audit
//! entry in one transaction; events go out only after commit.

use alaab_common::db::{GameConcept, GameSimilarity, MatchStatus, ReviewAction};
use alaab_common::events::{AlaabEvent, EventBus};
use alaab_common::{time, Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::db::similarities::{self, Decision, GameSummary};
use crate::db::{concepts, games, review_logs};
use crate::permissions::{self, Actor, Capability};
use crate::services::concepts::{concept_created, concept_not_found, insert_with_members};

/// Where an accepted match is filed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConceptTarget {
    /// Attach both games to this concept
    Existing(Uuid),
    /// Create a concept named after game A
    CreateNew,
}

impl From<Option<Uuid>> for ConceptTarget {
    fn from(concept_id: Option<Uuid>) -> Self {
        match concept_id {
            Some(id) => ConceptTarget::Existing(id),
            None => ConceptTarget::CreateNew,
        }
    }
}

/// Queue entry: the similarity plus both games at a glance
#[derive(Debug, Clone, Serialize)]
pub struct PendingMatch {
    #[serde(flatten)]
    pub similarity: GameSimilarity,
    pub game_a: GameSummary,
    pub game_b: GameSummary,
}

/// Similarity count per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub postponed: i64,
}

pub struct ReviewQueue {
    db: Pool<Sqlite>,
    event_bus: EventBus,
}

impl ReviewQueue {
    pub fn new(db: Pool<Sqlite>, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Pending and postponed matches, newest first
    pub async fn get_pending_matches(&self) -> Result<Vec<PendingMatch>> {
        let rows = similarities::list_actionable(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(similarity, game_a, game_b)| PendingMatch {
                similarity,
                game_a,
                game_b,
            })
            .collect())
    }

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        let mut stats = QueueStats::default();
        for (status, count) in similarities::count_by_status(&self.db).await? {
            match status {
                MatchStatus::Pending => stats.pending = count,
                MatchStatus::Accepted => stats.accepted = count,
                MatchStatus::Rejected => stats.rejected = count,
                MatchStatus::Postponed => stats.postponed = count,
            }
        }
        Ok(stats)
    }

    /// Accept a match and file both games under a concept
    pub async fn accept_similarity(
        &self,
        actor: &Actor,
        similarity_id: Uuid,
        target: ConceptTarget,
        notes: Option<String>,
    ) -> Result<GameSimilarity> {
        permissions::require(actor, Capability::ResolveMatches)?;

        let now = time::now();
        let now_db = time::to_db(&now);
        let mut tx = self.db.begin().await?;

        let similarity = load_actionable(&mut tx, similarity_id).await?;
        let members = [similarity.game_a_id, similarity.game_b_id];

        let mut created: Option<GameConcept> = None;
        let concept_id = match target {
            ConceptTarget::Existing(concept_id) => {
                concepts::load_concept(&mut tx, concept_id)
                    .await?
                    .ok_or_else(|| concept_not_found(concept_id))?;
                for game_id in members {
                    concepts::add_member(&mut tx, concept_id, game_id, &now_db).await?;
                }
                concept_id
            }
            ConceptTarget::CreateNew => {
                let game_a = games::load_game(&mut tx, similarity.game_a_id)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Game {} not found", similarity.game_a_id)))?;
                let concept = GameConcept {
                    id: Uuid::new_v4(),
                    name: game_a.canonical_name,
                    description: None,
                    canonical_game_id: Some(similarity.game_a_id),
                    created_by: actor.id,
                    created_at: now,
                };
                insert_with_members(&mut tx, &concept, &members).await?;
                let concept_id = concept.id;
                created = Some(concept);
                concept_id
            }
        };

        self.record(&mut tx, actor, &similarity, MatchStatus::Accepted, Some(concept_id), notes.as_deref(), &now_db)
            .await?;
        tx.commit().await?;

        tracing::info!(
            similarity_id = %similarity_id,
            concept_id = %concept_id,
            reviewer = %actor.id,
            "Accepted match"
        );

        if let Some(concept) = &created {
            self.event_bus.emit_lossy(concept_created(concept));
        }
        self.emit_resolved(similarity_id, MatchStatus::Accepted, Some(concept_id), actor.id, now);

        self.reload(similarity_id).await
    }

    /// Reject a match; the pair may come back if its score later changes
    pub async fn reject_similarity(
        &self,
        actor: &Actor,
        similarity_id: Uuid,
        notes: Option<String>,
    ) -> Result<GameSimilarity> {
        self.decide(actor, similarity_id, MatchStatus::Rejected, notes).await
    }

    /// Set a match aside; it stays in the queue
    pub async fn postpone_similarity(
        &self,
        actor: &Actor,
        similarity_id: Uuid,
        notes: Option<String>,
    ) -> Result<GameSimilarity> {
        self.decide(actor, similarity_id, MatchStatus::Postponed, notes).await
    }

    async fn decide(
        &self,
        actor: &Actor,
        similarity_id: Uuid,
        status: MatchStatus,
        notes: Option<String>,
    ) -> Result<GameSimilarity> {
        permissions::require(actor, Capability::ResolveMatches)?;

        let now = time::now();
        let now_db = time::to_db(&now);
        let mut tx = self.db.begin().await?;

        let similarity = load_actionable(&mut tx, similarity_id).await?;
        self.record(&mut tx, actor, &similarity, status, None, notes.as_deref(), &now_db)
            .await?;
        tx.commit().await?;

        tracing::info!(
            similarity_id = %similarity_id,
            status = %status,
            reviewer = %actor.id,
            "Decided match"
        );
        self.emit_resolved(similarity_id, status, similarity.concept_id, actor.id, now);

        self.reload(similarity_id).await
    }

    /// Write the decision and its audit entry against game A
    #[allow(clippy::too_many_arguments)]
    async fn record(
        &self,
        conn: &mut sqlx::SqliteConnection,
        actor: &Actor,
        similarity: &GameSimilarity,
        status: MatchStatus,
        concept_id: Option<Uuid>,
        notes: Option<&str>,
        now_db: &str,
    ) -> Result<()> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        let decision = Decision {
            status,
            concept_id,
            reviewer_id: actor.id,
            notes,
            reviewed_at: now_db,
        };
        if !similarities::record_decision(&mut *conn, similarity.id, &decision).await? {
            return Err(already_decided(similarity.id));
        }

        let audit = match notes {
            Some(notes) => format!("match {} {}: {}", similarity.id, status, notes),
            None => format!("match {} {}", similarity.id, status),
        };
        review_logs::append(
            &mut *conn,
            similarity.game_a_id,
            actor.id,
            ReviewAction::Updated,
            Some(&audit),
            now_db,
        )
        .await?;

        Ok(())
    }

    fn emit_resolved(
        &self,
        similarity_id: Uuid,
        status: MatchStatus,
        concept_id: Option<Uuid>,
        reviewer_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) {
        self.event_bus.emit_lossy(AlaabEvent::MatchResolved {
            similarity_id,
            status,
            concept_id,
            reviewer_id,
            timestamp,
        });
    }

    async fn reload(&self, similarity_id: Uuid) -> Result<GameSimilarity> {
        let mut conn = self.db.acquire().await?;
        similarities::load_similarity(&mut conn, similarity_id)
            .await?
            .ok_or_else(|| similarity_not_found(similarity_id))
    }
}

async fn load_actionable(conn: &mut sqlx::SqliteConnection, similarity_id: Uuid) -> Result<GameSimilarity> {
    let similarity = similarities::load_similarity(conn, similarity_id)
        .await?
        .ok_or_else(|| similarity_not_found(similarity_id))?;

    if !similarity.status.is_actionable() {
        return Err(already_decided(similarity_id));
    }
    Ok(similarity)
}

fn similarity_not_found(similarity_id: Uuid) -> Error {
    Error::NotFound(format!("Similarity {} not found", similarity_id))
}

fn already_decided(similarity_id: Uuid) -> Error {
    Error::Conflict(format!("Similarity {} has already been decided", similarity_id))
}
