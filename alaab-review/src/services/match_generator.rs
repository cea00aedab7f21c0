//! Candidate match generation
//!
//! Scores one game against every other non-archived game and files pending
//! similarity records for pairs at or above the configured threshold.
//!
//! **Rules:**
//! - At most one active (pending/accepted/postponed) record per unordered
//!   pair; the partial unique index backs this up under concurrent runs
//! - A rejected pair comes back only when its overall score has changed
//! - One bad candidate never aborts the run

use alaab_common::config::MatchingConfig;
use alaab_common::db::{GameSimilarity, MatchStatus};
use alaab_common::events::{AlaabEvent, EventBus};
use alaab_common::uuid_utils::canonical_pair;
use alaab_common::{time, Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::games::{self, SnapshotRow};
use crate::db::similarities;
use crate::scoring::{score_pair, GameSnapshot};

/// Scores closer than this are the same score
const SCORE_EPSILON: f64 = 1e-9;

/// Outcome counts of one matching run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchRunSummary {
    /// Candidates scored without error
    pub candidates_scored: usize,
    /// New pending records filed
    pub matches_created: usize,
    /// Above threshold but the pair already has an active record
    pub skipped_existing: usize,
    /// Above threshold but rejected before with the same score
    pub skipped_rejected: usize,
    /// Candidates that failed to load or score
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CandidateOutcome {
    BelowThreshold,
    Created,
    AlreadyActive,
    RejectedUnchanged,
}

/// Match generator
pub struct MatchGenerator {
    db: Pool<Sqlite>,
    config: Arc<MatchingConfig>,
    event_bus: EventBus,
}

impl MatchGenerator {
    pub fn new(db: Pool<Sqlite>, config: Arc<MatchingConfig>, event_bus: EventBus) -> Self {
        Self {
            db,
            config,
            event_bus,
        }
    }

    /// Score `game_id` against the catalogue and file new candidate matches
    ///
    /// Returns `Error::NotFound` if the game does not exist. An archived
    /// subject yields an empty summary.
    pub async fn calculate_similarities_for_new_game(&self, game_id: Uuid) -> Result<MatchRunSummary> {
        let subject_row = games::load_snapshot_row(&self.db, game_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game {} not found", game_id)))?;

        let mut summary = MatchRunSummary::default();
        if subject_row.review_status == "archived" {
            tracing::debug!(game_id = %game_id, "Archived game, skipping similarity scan");
            return Ok(summary);
        }

        let tags = games::load_snapshot_tags(&self.db).await?;
        let subject_tags = tags.get(&subject_row.guid).cloned().unwrap_or_default();
        let subject = subject_row.into_snapshot(&subject_tags)?;

        let candidates = games::load_candidate_rows(&self.db, game_id).await?;
        tracing::debug!(
            game_id = %game_id,
            candidates = candidates.len(),
            "Starting similarity scan"
        );

        for row in candidates {
            let candidate_guid = row.guid.clone();
            match self.consider_candidate(&subject, row, &tags).await {
                Ok(outcome) => {
                    summary.candidates_scored += 1;
                    match outcome {
                        CandidateOutcome::BelowThreshold => {}
                        CandidateOutcome::Created => summary.matches_created += 1,
                        CandidateOutcome::AlreadyActive => summary.skipped_existing += 1,
                        CandidateOutcome::RejectedUnchanged => summary.skipped_rejected += 1,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        game_id = %game_id,
                        candidate = %candidate_guid,
                        error = %e,
                        "Failed to score candidate, skipping"
                    );
                    summary.failures += 1;
                }
            }
        }

        tracing::info!(
            game_id = %game_id,
            scored = summary.candidates_scored,
            created = summary.matches_created,
            failures = summary.failures,
            "Similarity scan complete"
        );

        Ok(summary)
    }

    async fn consider_candidate(
        &self,
        subject: &GameSnapshot,
        row: SnapshotRow,
        tags: &HashMap<String, Vec<String>>,
    ) -> Result<CandidateOutcome> {
        let candidate_tags = tags.get(&row.guid).map(Vec::as_slice).unwrap_or(&[]);
        let candidate = row.into_snapshot(candidate_tags)?;

        let scores = score_pair(subject, &candidate, &self.config)
            .map_err(|e| Error::Internal(e.to_string()))?;
        if !scores.meets_threshold(&self.config) {
            return Ok(CandidateOutcome::BelowThreshold);
        }

        let (game_a_id, game_b_id) = canonical_pair(subject.id, candidate.id);
        if similarities::has_active_record(&self.db, game_a_id, game_b_id).await? {
            return Ok(CandidateOutcome::AlreadyActive);
        }

        if let Some(rejected_score) =
            similarities::latest_rejected_score(&self.db, game_a_id, game_b_id).await?
        {
            if (rejected_score - scores.overall).abs() < SCORE_EPSILON {
                tracing::debug!(
                    game_a = %game_a_id,
                    game_b = %game_b_id,
                    score = scores.overall,
                    "Pair was rejected at this score, not re-proposing"
                );
                return Ok(CandidateOutcome::RejectedUnchanged);
            }
        }

        let similarity = GameSimilarity {
            id: Uuid::new_v4(),
            game_a_id,
            game_b_id,
            structural_score: scores.structural,
            semantic_score: scores.semantic,
            heritage_score: scores.heritage,
            overall_score: scores.overall,
            algorithm: self.config.algorithm.clone(),
            ai_assisted: false,
            explanation: serde_json::to_value(&scores.explanation)?,
            status: MatchStatus::Pending,
            concept_id: None,
            reviewer_id: None,
            review_notes: None,
            created_at: time::now(),
            reviewed_at: None,
        };

        // Lost a race with a concurrent run for the same pair
        if !similarities::insert_if_absent(&self.db, &similarity).await? {
            return Ok(CandidateOutcome::AlreadyActive);
        }

        tracing::info!(
            similarity_id = %similarity.id,
            game_a = %game_a_id,
            game_b = %game_b_id,
            score = similarity.overall_score,
            "Proposed match"
        );

        self.event_bus.emit_lossy(AlaabEvent::MatchProposed {
            similarity_id: similarity.id,
            game_a_id,
            game_b_id,
            overall_score: similarity.overall_score,
            timestamp: similarity.created_at,
        });

        Ok(CandidateOutcome::Created)
    }
}
