//! Game concepts: curated clusters of regional variants
//!
//! Concepts are created explicitly here or implicitly when a match is
//! accepted without a target concept. They are deleted only explicitly.

use alaab_common::db::GameConcept;
use alaab_common::events::{AlaabEvent, EventBus};
use alaab_common::{time, Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::db::concepts::{self, ConceptListing, ConceptMember};
use crate::db::games;
use crate::permissions::{self, Actor, Capability};

/// Input for explicit concept creation
#[derive(Debug, Clone, Default)]
pub struct NewConcept {
    pub name: String,
    pub description: Option<String>,
    pub canonical_game_id: Option<Uuid>,
}

/// Concept with its member games
#[derive(Debug, Clone, Serialize)]
pub struct ConceptDetail {
    #[serde(flatten)]
    pub concept: GameConcept,
    pub games: Vec<ConceptMember>,
}

pub struct ConceptService {
    db: Pool<Sqlite>,
    event_bus: EventBus,
}

impl ConceptService {
    pub fn new(db: Pool<Sqlite>, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }

    /// Create a concept; the canonical game, if any, becomes its first member
    pub async fn create_game_concept(&self, actor: &Actor, input: NewConcept) -> Result<GameConcept> {
        permissions::require(actor, Capability::ManageConcepts)?;

        let name = input.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Concept name must not be empty".to_string()));
        }

        let concept = GameConcept {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            canonical_game_id: input.canonical_game_id,
            created_by: actor.id,
            created_at: time::now(),
        };

        let mut tx = self.db.begin().await?;
        if let Some(game_id) = concept.canonical_game_id {
            ensure_game_exists(&mut tx, game_id).await?;
        }
        insert_with_members(&mut tx, &concept, concept.canonical_game_id.as_slice()).await?;
        tx.commit().await?;

        tracing::info!(concept_id = %concept.id, actor = %actor.id, "Created concept");
        self.event_bus.emit_lossy(concept_created(&concept));

        Ok(concept)
    }

    /// All concepts with member counts
    pub async fn get_game_concepts(&self) -> Result<Vec<ConceptListing>> {
        concepts::list_concepts(&self.db).await
    }

    pub async fn get_concept_with_games(&self, concept_id: Uuid) -> Result<ConceptDetail> {
        let mut conn = self.db.acquire().await?;
        let concept = concepts::load_concept(&mut conn, concept_id)
            .await?
            .ok_or_else(|| concept_not_found(concept_id))?;
        drop(conn);

        let games = concepts::list_members(&self.db, concept_id).await?;
        Ok(ConceptDetail { concept, games })
    }

    /// Add a game to a concept
    ///
    /// Returns false when the game was already a member.
    pub async fn add_game_to_concept(&self, actor: &Actor, concept_id: Uuid, game_id: Uuid) -> Result<bool> {
        permissions::require(actor, Capability::ManageConcepts)?;

        let mut tx = self.db.begin().await?;
        concepts::load_concept(&mut tx, concept_id)
            .await?
            .ok_or_else(|| concept_not_found(concept_id))?;
        ensure_game_exists(&mut tx, game_id).await?;
        let added = concepts::add_member(&mut tx, concept_id, game_id, &time::now_db()).await?;
        tx.commit().await?;

        if added {
            tracing::info!(concept_id = %concept_id, game_id = %game_id, "Added game to concept");
        }
        Ok(added)
    }

    /// Remove a game from a concept
    pub async fn remove_game_from_concept(&self, actor: &Actor, game_id: Uuid, concept_id: Uuid) -> Result<()> {
        permissions::require(actor, Capability::ManageConcepts)?;

        let mut tx = self.db.begin().await?;
        if !concepts::remove_member(&mut tx, concept_id, game_id).await? {
            return Err(Error::NotFound(format!(
                "Game {} is not a member of concept {}",
                game_id, concept_id
            )));
        }
        tx.commit().await?;

        tracing::info!(concept_id = %concept_id, game_id = %game_id, "Removed game from concept");
        Ok(())
    }

    /// Delete a concept; accepted matches keep their status
    pub async fn delete_game_concept(&self, actor: &Actor, concept_id: Uuid) -> Result<()> {
        permissions::require(actor, Capability::ManageConcepts)?;

        let mut tx = self.db.begin().await?;
        if !concepts::delete_concept(&mut tx, concept_id).await? {
            return Err(concept_not_found(concept_id));
        }
        tx.commit().await?;

        tracing::info!(concept_id = %concept_id, actor = %actor.id, "Deleted concept");
        Ok(())
    }
}

/// Insert a concept and its initial members on the caller's connection
pub(crate) async fn insert_with_members(
    conn: &mut SqliteConnection,
    concept: &GameConcept,
    members: &[Uuid],
) -> Result<()> {
    concepts::insert_concept(&mut *conn, concept).await?;
    let added_at = time::to_db(&concept.created_at);
    for game_id in members {
        concepts::add_member(&mut *conn, concept.id, *game_id, &added_at).await?;
    }
    Ok(())
}

pub(crate) fn concept_created(concept: &GameConcept) -> AlaabEvent {
    AlaabEvent::ConceptCreated {
        concept_id: concept.id,
        name: concept.name.clone(),
        created_by: concept.created_by,
        timestamp: concept.created_at,
    }
}

pub(crate) fn concept_not_found(concept_id: Uuid) -> Error {
    Error::NotFound(format!("Concept {} not found", concept_id))
}

async fn ensure_game_exists(conn: &mut SqliteConnection, game_id: Uuid) -> Result<()> {
    match games::load_review_status(conn, game_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("Game {} not found", game_id))),
    }
}
