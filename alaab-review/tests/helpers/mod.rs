//! Shared fixtures for alaab-review integration tests
//!
//! Seeds users of every role, a few countries across two regions, heritage
//! fields and tags into a private in-memory database, or into a WAL file
//! database for tests that need real concurrent connections.

#![allow(dead_code)]

use alaab_common::config::MatchingConfig;
use alaab_common::db::{init_database, init_memory_database, Country, Game, HeritageField, ReviewStatus, Role, Tag, User};
use alaab_common::events::EventBus;
use alaab_common::time;
use alaab_review::db::{games, reference, users};
use alaab_review::permissions::Actor;
use alaab_review::AppState;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub struct Fixture {
    pub pool: SqlitePool,
    pub event_bus: EventBus,
    pub editor: Actor,
    pub other_editor: Actor,
    pub reviewer: Actor,
    pub admin: Actor,
    /// Gulf
    pub kuwait: Uuid,
    /// Gulf
    pub bahrain: Uuid,
    /// Maghreb
    pub morocco: Uuid,
    pub board_games: Uuid,
    pub running_games: Uuid,
    pub tag_stones: Uuid,
    pub tag_outdoor: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::seeded(init_memory_database().await.unwrap()).await
    }

    /// Fixture over a file database with a multi-connection pool
    pub async fn on_file(db_path: &Path) -> Self {
        Self::seeded(init_database(db_path).await.unwrap()).await
    }

    async fn seeded(pool: SqlitePool) -> Self {
        let editor = seed_user(&pool, "محرر", Role::Editor).await;
        let other_editor = seed_user(&pool, "محرر آخر", Role::Editor).await;
        let reviewer = seed_user(&pool, "مراجع", Role::Reviewer).await;
        let admin = seed_user(&pool, "مشرف", Role::Admin).await;

        let kuwait = seed_country(&pool, "الكويت", "Gulf").await;
        let bahrain = seed_country(&pool, "البحرين", "Gulf").await;
        let morocco = seed_country(&pool, "المغرب", "Maghreb").await;

        let board_games = seed_field(&pool, "الألعاب اللوحية").await;
        let running_games = seed_field(&pool, "ألعاب الجري").await;

        let tag_stones = seed_tag(&pool, "حصى").await;
        let tag_outdoor = seed_tag(&pool, "في الهواء الطلق").await;

        Self {
            pool,
            event_bus: EventBus::new(100),
            editor,
            other_editor,
            reviewer,
            admin,
            kuwait,
            bahrain,
            morocco,
            board_games,
            running_games,
            tag_stones,
            tag_outdoor,
        }
    }

    pub fn matching(&self) -> Arc<MatchingConfig> {
        Arc::new(MatchingConfig::default())
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.pool.clone(), self.event_bus.clone(), MatchingConfig::default())
    }

    /// Kuwaiti two-player stone board game, drafted by `editor`
    pub fn seega(&self) -> Game {
        let now = time::now();
        Game {
            id: Uuid::new_v4(),
            canonical_name: "السيجة".to_string(),
            local_names: vec!["السيزة".to_string()],
            country_id: self.kuwait,
            heritage_field_id: self.board_games,
            description: "لعبة لوحية يلعبها شخصان بالحصى على مربعات مرسومة في الرمل".to_string(),
            rules: vec!["يضع كل لاعب حصاه بالتناوب".to_string()],
            tools: vec!["حصى".to_string(), "لوح رملي".to_string()],
            player_count: Some("2".to_string()),
            age_group: Some("الكبار".to_string()),
            tag_ids: vec![self.tag_stones],
            review_status: ReviewStatus::Draft,
            contributor_id: self.editor.id,
            reviewer_id: None,
            created_at: now,
            updated_at: now,
            published_at: None,
        }
    }

    /// Moroccan outdoor chasing game with nothing in common with [`Fixture::seega`]
    pub fn tag_game(&self) -> Game {
        Game {
            canonical_name: "طاق طاق طاقية".to_string(),
            local_names: Vec::new(),
            country_id: self.morocco,
            heritage_field_id: self.running_games,
            description: "جري في دائرة".to_string(),
            rules: Vec::new(),
            tools: vec!["منديل".to_string()],
            player_count: Some("10".to_string()),
            age_group: None,
            tag_ids: vec![self.tag_outdoor],
            ..self.seega()
        }
    }

    /// Insert a game directly, bypassing matching
    pub async fn insert(&self, game: &Game) {
        let mut conn = self.pool.acquire().await.unwrap();
        games::insert_game(&mut conn, game).await.unwrap();
    }

    /// Insert a game with the given status
    pub async fn insert_with_status(&self, mut game: Game, status: ReviewStatus) -> Game {
        game.review_status = status;
        self.insert(&game).await;
        game
    }

    pub async fn review_log_count(&self, game_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM review_logs WHERE game_id = ?")
            .bind(game_id.to_string())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn stored_status(&self, game_id: Uuid) -> String {
        sqlx::query_scalar("SELECT review_status FROM games WHERE guid = ?")
            .bind(game_id.to_string())
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Active (pending/accepted/postponed) similarity records for an unordered pair
    pub async fn active_records(&self, x: Uuid, y: Uuid) -> i64 {
        let (a, b) = alaab_common::uuid_utils::canonical_pair(x, y);
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM game_similarities WHERE game_a_id = ? AND game_b_id = ? \
             AND status IN ('pending', 'accepted', 'postponed')",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .fetch_one(&self.pool)
        .await
        .unwrap()
    }

    pub async fn similarity_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM game_similarities")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

async fn seed_user(pool: &SqlitePool, name: &str, role: Role) -> Actor {
    let user = User {
        id: Uuid::new_v4(),
        display_name: name.to_string(),
        role,
        created_at: time::now(),
    };
    users::save_user(pool, &user).await.unwrap();
    Actor::new(user.id, role)
}

async fn seed_country(pool: &SqlitePool, name: &str, region: &str) -> Uuid {
    let country = Country {
        id: Uuid::new_v4(),
        name: name.to_string(),
        name_en: None,
        region: Some(region.to_string()),
    };
    reference::save_country(pool, &country).await.unwrap();
    country.id
}

async fn seed_field(pool: &SqlitePool, name: &str) -> Uuid {
    let field = HeritageField {
        id: Uuid::new_v4(),
        name: name.to_string(),
        name_en: None,
    };
    reference::save_heritage_field(pool, &field).await.unwrap();
    field.id
}

async fn seed_tag(pool: &SqlitePool, name: &str) -> Uuid {
    let tag = Tag {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    reference::save_tag(pool, &tag).await.unwrap();
    tag.id
}
