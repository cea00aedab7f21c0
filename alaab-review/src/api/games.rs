//! Game authoring and workflow endpoints

use alaab_common::db::{Game, ReviewLog};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::error::{ApiResponse, ApiResult};
use crate::permissions::Actor;
use crate::services::{GameInput, MatchRunSummary, SavedGame, WorkflowAction};
use crate::AppState;

/// Request payload for POST /api/games/:id/review
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// One of submit, approve, reject, revision, archive
    pub action: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /api/games
///
/// Published catalogue.
pub async fn list_games(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Game>>>> {
    let games = state.games().list_published().await?;
    Ok(ApiResponse::ok(format!("{} published games", games.len()), games))
}

/// POST /api/games
///
/// Creates a draft owned by the caller and runs a similarity scan.
pub async fn create_game(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiJson(input): ApiJson<GameInput>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SavedGame>>)> {
    let saved = state.games().create_game(&actor, input).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok("Game created", saved)))
}

/// GET /api/games/:id
pub async fn get_game(
    State(state): State<AppState>,
    ApiPath(game_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Game>>> {
    let game = state.games().get_game(game_id).await?;
    Ok(ApiResponse::ok("Game loaded", game))
}

/// PUT /api/games/:id
pub async fn update_game(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(game_id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<GameInput>,
) -> ApiResult<Json<ApiResponse<SavedGame>>> {
    let saved = state.games().update_game(&actor, game_id, input).await?;
    Ok(ApiResponse::ok("Game updated", saved))
}

/// GET /api/games/:id/history
pub async fn game_history(
    State(state): State<AppState>,
    ApiPath(game_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<ReviewLog>>>> {
    let history = state.workflow().review_history(game_id).await?;
    Ok(ApiResponse::ok(format!("{} review log entries", history.len()), history))
}

/// POST /api/games/:id/review
///
/// **Request:** `{"action": "reject", "notes": "..."}`
///
/// **Errors:**
/// - 400: unknown action, or reject/revision without notes
/// - 403: role not allowed
/// - 409: action not legal from the current status
pub async fn review_game(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(game_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> ApiResult<Json<ApiResponse<Game>>> {
    let action: WorkflowAction = request.action.parse()?;
    let game = state
        .workflow()
        .apply_action(&actor, game_id, action, request.notes)
        .await?;
    Ok(ApiResponse::ok(format!("Game is now {}", game.review_status), game))
}

/// POST /api/games/:id/similarities/calculate
pub async fn calculate_similarities(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(game_id): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<MatchRunSummary>>> {
    let summary = state.games().calculate_similarities(&actor, game_id).await?;
    Ok(ApiResponse::ok(
        format!("{} new matches", summary.matches_created),
        summary,
    ))
}

pub fn game_routes() -> Router<AppState> {
    Router::new()
        .route("/api/games", get(list_games).post(create_game))
        .route("/api/games/:id", get(get_game).put(update_game))
        .route("/api/games/:id/history", get(game_history))
        .route("/api/games/:id/review", post(review_game))
        .route(
            "/api/games/:id/similarities/calculate",
            post(calculate_similarities),
        )
}
