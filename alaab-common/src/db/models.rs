//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Role of an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Editor,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Editor => "editor",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "editor" => Ok(Role::Editor),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publication lifecycle state of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Draft,
    UnderReview,
    Published,
    Rejected,
    Archived,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 5] = [
        ReviewStatus::Draft,
        ReviewStatus::UnderReview,
        ReviewStatus::Published,
        ReviewStatus::Rejected,
        ReviewStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Draft => "draft",
            ReviewStatus::UnderReview => "under_review",
            ReviewStatus::Published => "published",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Archived => "archived",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReviewStatus::Draft),
            "under_review" => Ok(ReviewStatus::UnderReview),
            "published" => Ok(ReviewStatus::Published),
            "rejected" => Ok(ReviewStatus::Rejected),
            "archived" => Ok(ReviewStatus::Archived),
            other => Err(Error::InvalidInput(format!("Unknown review status: {}", other))),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit trail action recorded in review_logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Created,
    Updated,
    Submitted,
    Approved,
    Rejected,
    Published,
    Archived,
}

impl ReviewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewAction::Created => "created",
            ReviewAction::Updated => "updated",
            ReviewAction::Submitted => "submitted",
            ReviewAction::Approved => "approved",
            ReviewAction::Rejected => "rejected",
            ReviewAction::Published => "published",
            ReviewAction::Archived => "archived",
        }
    }
}

impl FromStr for ReviewAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(ReviewAction::Created),
            "updated" => Ok(ReviewAction::Updated),
            "submitted" => Ok(ReviewAction::Submitted),
            "approved" => Ok(ReviewAction::Approved),
            "rejected" => Ok(ReviewAction::Rejected),
            "published" => Ok(ReviewAction::Published),
            "archived" => Ok(ReviewAction::Archived),
            other => Err(Error::InvalidInput(format!("Unknown review action: {}", other))),
        }
    }
}

/// Review state of a similarity match
///
/// `pending → accepted | rejected | postponed`; postponed stays actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Accepted => "accepted",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Postponed => "postponed",
        }
    }

    /// Statuses covered by the one-record-per-pair uniqueness rule
    pub fn is_active(&self) -> bool {
        !matches!(self, MatchStatus::Rejected)
    }

    /// Statuses a reviewer can still decide on
    pub fn is_actionable(&self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Postponed)
    }
}

impl FromStr for MatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "accepted" => Ok(MatchStatus::Accepted),
            "rejected" => Ok(MatchStatus::Rejected),
            "postponed" => Ok(MatchStatus::Postponed),
            other => Err(Error::InvalidInput(format!("Unknown match status: {}", other))),
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
    /// Cultural region (e.g. Gulf, Levant, Maghreb)
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeritageField {
    pub id: Uuid,
    pub name: String,
    pub name_en: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// A catalogued traditional game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub canonical_name: String,
    pub local_names: Vec<String>,
    pub country_id: Uuid,
    pub heritage_field_id: Uuid,
    pub description: String,
    /// Ordered atomic rule statements
    pub rules: Vec<String>,
    pub tools: Vec<String>,
    pub player_count: Option<String>,
    pub age_group: Option<String>,
    pub tag_ids: Vec<Uuid>,
    pub review_status: ReviewStatus,
    pub contributor_id: Uuid,
    pub reviewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Scored pairing between two games, awaiting or past review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSimilarity {
    pub id: Uuid,
    pub game_a_id: Uuid,
    pub game_b_id: Uuid,
    pub structural_score: f64,
    pub semantic_score: f64,
    pub heritage_score: f64,
    pub overall_score: f64,
    pub algorithm: String,
    pub ai_assisted: bool,
    pub explanation: serde_json::Value,
    pub status: MatchStatus,
    pub concept_id: Option<Uuid>,
    pub reviewer_id: Option<Uuid>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Curator-defined cluster of regional variants of one game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConcept {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub canonical_game_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewLog {
    pub id: i64,
    pub game_id: Uuid,
    pub reviewer_id: Uuid,
    pub action: ReviewAction,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
