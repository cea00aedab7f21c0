//! Submission workflow state machine
//!
//! ```text
//! draft ──submit──► under_review ──approve──► published
//!   ▲                 │    │                     │
//!   └────revision─────┘    └──reject──► rejected │
//!   ▲                                            │
//!   └──────────────────revision──────────────────┘
//!
//! draft | published | rejected ──archive──► archived
//! ```
//!
//! Each transition checks permission, legality and notes before touching the
//! database, then updates the game and appends its audit entries in one
//! transaction. A failed check changes nothing and logs nothing.

use alaab_common::db::{Game, ReviewAction, ReviewLog, ReviewStatus};
use alaab_common::events::{AlaabEvent, EventBus};
use alaab_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::{games, review_logs};
use crate::permissions::{self, Actor, Capability};

/// Action requested on a game's review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Reject,
    Revision,
    Archive,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 5] = [
        WorkflowAction::Submit,
        WorkflowAction::Approve,
        WorkflowAction::Reject,
        WorkflowAction::Revision,
        WorkflowAction::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::Submit => "submit",
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Revision => "revision",
            WorkflowAction::Archive => "archive",
        }
    }

    /// Reject and revision must say why
    pub fn requires_notes(&self) -> bool {
        matches!(self, WorkflowAction::Reject | WorkflowAction::Revision)
    }
}

impl FromStr for WorkflowAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "submit" => Ok(WorkflowAction::Submit),
            "approve" => Ok(WorkflowAction::Approve),
            "reject" => Ok(WorkflowAction::Reject),
            "revision" => Ok(WorkflowAction::Revision),
            "archive" => Ok(WorkflowAction::Archive),
            other => Err(Error::InvalidInput(format!("Unknown review action: {}", other))),
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target status of `action` from `from`, or `None` if the move is illegal
pub fn next_status(from: ReviewStatus, action: WorkflowAction) -> Option<ReviewStatus> {
    use ReviewStatus::*;
    use WorkflowAction::*;

    match (from, action) {
        (Draft, Submit) => Some(UnderReview),
        (UnderReview, Approve) => Some(Published),
        (UnderReview, Reject) => Some(Rejected),
        (UnderReview, Revision) | (Published, Revision) => Some(Draft),
        (Draft, Archive) | (Published, Archive) | (Rejected, Archive) => Some(Archived),
        _ => None,
    }
}

/// Audit actions written for a transition, in order
fn audit_actions(action: WorkflowAction) -> &'static [ReviewAction] {
    match action {
        WorkflowAction::Submit => &[ReviewAction::Submitted],
        WorkflowAction::Approve => &[ReviewAction::Approved, ReviewAction::Published],
        WorkflowAction::Reject => &[ReviewAction::Rejected],
        WorkflowAction::Revision => &[ReviewAction::Updated],
        WorkflowAction::Archive => &[ReviewAction::Archived],
    }
}

fn authorize(actor: &Actor, action: WorkflowAction, contributor_id: Uuid) -> Result<()> {
    match action {
        WorkflowAction::Submit => permissions::require_on_owned(
            actor,
            Capability::SubmitAny,
            Capability::SubmitOwn,
            contributor_id,
        ),
        WorkflowAction::Approve | WorkflowAction::Reject | WorkflowAction::Revision => {
            permissions::require(actor, Capability::Review)
        }
        WorkflowAction::Archive => permissions::require_on_owned(
            actor,
            Capability::ArchiveAny,
            Capability::ArchiveOwn,
            contributor_id,
        ),
    }
}

pub struct ReviewWorkflow {
    db: Pool<Sqlite>,
    event_bus: EventBus,
}

impl ReviewWorkflow {
    pub fn new(db: Pool<Sqlite>, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Apply a workflow action to a game and return the updated game
    ///
    /// **Errors:**
    /// - `NotFound`: no such game
    /// - `Unauthorized`: the actor's role (or ownership) does not allow it
    /// - `Conflict`: the action is not legal from the current status
    /// - `InvalidInput`: reject or revision without notes
    pub async fn apply_action(
        &self,
        actor: &Actor,
        game_id: Uuid,
        action: WorkflowAction,
        notes: Option<String>,
    ) -> Result<Game> {
        let mut tx = self.db.begin().await?;

        let (from, contributor_id) = games::load_review_status(&mut tx, game_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game {} not found", game_id)))?;

        authorize(actor, action, contributor_id)?;

        let to = next_status(from, action).ok_or_else(|| {
            Error::Conflict(format!("Cannot {} a game that is {}", action, from))
        })?;

        let notes = notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if action.requires_notes() && notes.is_none() {
            return Err(Error::InvalidInput(format!("Notes are required to {}", action)));
        }

        let now = time::now();
        let now_db = time::to_db(&now);

        if !games::transition_status(&mut tx, game_id, from, to, &now_db).await? {
            return Err(Error::Conflict(format!(
                "Game {} changed status concurrently",
                game_id
            )));
        }

        match action {
            WorkflowAction::Approve => {
                games::mark_published(&mut tx, game_id, actor.id, &now_db).await?;
            }
            WorkflowAction::Revision if from == ReviewStatus::Published => {
                games::clear_published(&mut tx, game_id).await?;
            }
            _ => {}
        }

        for audit in audit_actions(action) {
            review_logs::append(&mut tx, game_id, actor.id, *audit, notes.as_deref(), &now_db)
                .await?;
        }

        let game = games::load_game(&mut tx, game_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game {} not found", game_id)))?;

        tx.commit().await?;

        tracing::info!(
            game_id = %game_id,
            action = %action,
            from = %from,
            to = %to,
            actor = %actor.id,
            "Review status changed"
        );

        self.event_bus.emit_lossy(AlaabEvent::ReviewStatusChanged {
            game_id,
            old_status: from,
            new_status: to,
            actor_id: actor.id,
            timestamp: now,
        });

        Ok(game)
    }

    /// Audit trail of a game, oldest first
    pub async fn review_history(&self, game_id: Uuid) -> Result<Vec<ReviewLog>> {
        let mut conn = self.db.acquire().await?;
        if games::load_review_status(&mut conn, game_id).await?.is_none() {
            return Err(Error::NotFound(format!("Game {} not found", game_id)));
        }
        drop(conn);

        review_logs::list_for_game(&self.db, game_id).await
    }
}
