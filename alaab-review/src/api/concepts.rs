//! Concept endpoints

use alaab_common::db::GameConcept;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::concepts::ConceptListing;
use crate::api::extract::{ApiJson, ApiPath};
use crate::error::{ApiResponse, ApiResult};
use crate::permissions::Actor;
use crate::services::{ConceptDetail, NewConcept};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConceptRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub canonical_game_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddGameRequest {
    pub game_id: Uuid,
}

/// GET /api/concepts
pub async fn list_concepts(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<ConceptListing>>>> {
    let concepts = state.concepts().get_game_concepts().await?;
    Ok(ApiResponse::ok(format!("{} concepts", concepts.len()), concepts))
}

/// POST /api/concepts
pub async fn create_concept(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(request): ApiJson<CreateConceptRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<GameConcept>>)> {
    let concept = state
        .concepts()
        .create_game_concept(
            &actor,
            NewConcept {
                name: request.name,
                description: request.description,
                canonical_game_id: request.canonical_game_id,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Concept created", concept)))
}

/// GET /api/concepts/:id
pub async fn get_concept(
    State(state): State<AppState>,
    ApiPath(concept_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<ConceptDetail>>> {
    let detail = state.concepts().get_concept_with_games(concept_id).await?;
    Ok(ApiResponse::ok("Concept loaded", detail))
}

/// DELETE /api/concepts/:id
pub async fn delete_concept(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(concept_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state.concepts().delete_game_concept(&actor, concept_id).await?;
    Ok(ApiResponse::ok("Concept deleted", json!({ "concept_id": concept_id })))
}

/// POST /api/concepts/:id/games
pub async fn add_game(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(concept_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AddGameRequest>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let added = state
        .concepts()
        .add_game_to_concept(&actor, concept_id, request.game_id)
        .await?;
    let message = if added {
        "Game added to concept"
    } else {
        "Game already in concept"
    };
    Ok(ApiResponse::ok(
        message,
        json!({ "concept_id": concept_id, "game_id": request.game_id, "added": added }),
    ))
}

/// DELETE /api/concepts/:id/games/:game_id
pub async fn remove_game(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath((concept_id, game_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    state
        .concepts()
        .remove_game_from_concept(&actor, game_id, concept_id)
        .await?;
    Ok(ApiResponse::ok(
        "Game removed from concept",
        json!({ "concept_id": concept_id, "game_id": game_id }),
    ))
}

pub fn concept_routes() -> Router<AppState> {
    Router::new()
        .route("/api/concepts", get(list_concepts).post(create_concept))
        .route("/api/concepts/:id", get(get_concept).delete(delete_concept))
        .route("/api/concepts/:id/games", post(add_game))
        .route("/api/concepts/:id/games/:game_id", delete(remove_game))
}
