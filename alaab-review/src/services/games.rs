//! Game authoring
//!
//! Create and edit operations commit the game and its audit entry first,
//! then run the match generator. A matching failure is logged and reported
//! as absent in the outcome; it never undoes the edit.

use alaab_common::config::MatchingConfig;
use alaab_common::db::{Game, ReviewAction, ReviewStatus};
use alaab_common::events::EventBus;
use alaab_common::{time, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite, SqliteConnection};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{games, reference, review_logs};
use crate::permissions::{self, Actor, Capability};
use crate::services::match_generator::{MatchGenerator, MatchRunSummary};

/// Editable content of a game
#[derive(Debug, Clone, Deserialize)]
pub struct GameInput {
    pub canonical_name: String,
    #[serde(default)]
    pub local_names: Vec<String>,
    pub country_id: Uuid,
    pub heritage_field_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rules: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub player_count: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

/// Saved game plus the matching run it triggered
#[derive(Debug, Clone, Serialize)]
pub struct SavedGame {
    pub game: Game,
    /// `None` when matching failed after the save
    pub matching: Option<MatchRunSummary>,
}

pub struct GameService {
    db: Pool<Sqlite>,
    matcher: MatchGenerator,
}

impl GameService {
    pub fn new(db: Pool<Sqlite>, config: Arc<MatchingConfig>, event_bus: EventBus) -> Self {
        let matcher = MatchGenerator::new(db.clone(), config, event_bus);
        Self { db, matcher }
    }

    pub async fn get_game(&self, game_id: Uuid) -> Result<Game> {
        let mut conn = self.db.acquire().await?;
        games::load_game(&mut conn, game_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game {} not found", game_id)))
    }

    /// Published catalogue
    pub async fn list_published(&self) -> Result<Vec<Game>> {
        games::list_published(&self.db).await
    }

    /// Create a draft game owned by the actor
    pub async fn create_game(&self, actor: &Actor, input: GameInput) -> Result<SavedGame> {
        permissions::require(actor, Capability::CreateGame)?;

        let now = time::now();
        let mut game = Game {
            id: Uuid::new_v4(),
            canonical_name: String::new(),
            local_names: Vec::new(),
            country_id: input.country_id,
            heritage_field_id: input.heritage_field_id,
            description: String::new(),
            rules: Vec::new(),
            tools: Vec::new(),
            player_count: None,
            age_group: None,
            tag_ids: Vec::new(),
            review_status: ReviewStatus::Draft,
            contributor_id: actor.id,
            reviewer_id: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        };
        apply_input(&mut game, input)?;

        let mut tx = self.db.begin().await?;
        validate_references(&mut tx, &game).await?;
        games::insert_game(&mut tx, &game).await?;
        review_logs::append(
            &mut tx,
            game.id,
            actor.id,
            ReviewAction::Created,
            None,
            &time::to_db(&now),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(game_id = %game.id, contributor = %actor.id, "Created game");

        let matching = self.run_matching(game.id).await;
        Ok(SavedGame { game, matching })
    }

    /// Replace the content of a game
    ///
    /// Editors may change only their own drafts and rejected games; reviewers
    /// and admins any game that is not archived.
    pub async fn update_game(&self, actor: &Actor, game_id: Uuid, input: GameInput) -> Result<SavedGame> {
        let mut tx = self.db.begin().await?;
        let mut game = games::load_game(&mut tx, game_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Game {} not found", game_id)))?;

        permissions::require_on_owned(actor, Capability::EditAny, Capability::EditOwn, game.contributor_id)?;
        if game.review_status == ReviewStatus::Archived {
            return Err(Error::Conflict(format!("Game {} is archived", game_id)));
        }
        if !actor.can(Capability::EditAny)
            && !matches!(game.review_status, ReviewStatus::Draft | ReviewStatus::Rejected)
        {
            return Err(Error::Unauthorized(format!(
                "Editors cannot change a game that is {}",
                game.review_status
            )));
        }

        apply_input(&mut game, input)?;
        game.updated_at = time::now();

        validate_references(&mut tx, &game).await?;
        games::update_game_content(&mut tx, &game).await?;
        review_logs::append(
            &mut tx,
            game.id,
            actor.id,
            ReviewAction::Updated,
            None,
            &time::to_db(&game.updated_at),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(game_id = %game_id, actor = %actor.id, "Updated game");

        let matching = self.run_matching(game_id).await;
        Ok(SavedGame { game, matching })
    }

    /// On-demand similarity scan
    pub async fn calculate_similarities(&self, actor: &Actor, game_id: Uuid) -> Result<MatchRunSummary> {
        permissions::require(actor, Capability::RunMatching)?;
        self.matcher.calculate_similarities_for_new_game(game_id).await
    }

    async fn run_matching(&self, game_id: Uuid) -> Option<MatchRunSummary> {
        match self.matcher.calculate_similarities_for_new_game(game_id).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(game_id = %game_id, error = %e, "Similarity scan failed after save");
                None
            }
        }
    }
}

/// Copy trimmed input fields onto a game
fn apply_input(game: &mut Game, input: GameInput) -> Result<()> {
    let canonical_name = input.canonical_name.trim();
    if canonical_name.is_empty() {
        return Err(Error::InvalidInput("Canonical name must not be empty".to_string()));
    }

    game.canonical_name = canonical_name.to_string();
    game.local_names = clean_list(input.local_names);
    game.country_id = input.country_id;
    game.heritage_field_id = input.heritage_field_id;
    game.description = input.description.trim().to_string();
    game.rules = clean_list(input.rules);
    game.tools = clean_list(input.tools);
    game.player_count = clean_text(input.player_count);
    game.age_group = clean_text(input.age_group);

    let mut tag_ids = input.tag_ids;
    tag_ids.sort();
    tag_ids.dedup();
    game.tag_ids = tag_ids;

    Ok(())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn validate_references(conn: &mut SqliteConnection, game: &Game) -> Result<()> {
    if !reference::country_exists(&mut *conn, game.country_id).await? {
        return Err(Error::InvalidInput(format!("Unknown country {}", game.country_id)));
    }
    if !reference::heritage_field_exists(&mut *conn, game.heritage_field_id).await? {
        return Err(Error::InvalidInput(format!(
            "Unknown heritage field {}",
            game.heritage_field_id
        )));
    }
    let missing = reference::missing_tags(&mut *conn, &game.tag_ids).await?;
    if let Some(tag_id) = missing.first() {
        return Err(Error::InvalidInput(format!("Unknown tag {}", tag_id)));
    }
    Ok(())
}
