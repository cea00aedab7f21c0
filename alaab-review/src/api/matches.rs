//! Review queue endpoints

use alaab_common::db::GameSimilarity;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::extract::{ApiPath, OptionalJson};
use crate::error::{ApiResponse, ApiResult};
use crate::permissions::Actor;
use crate::services::{ConceptTarget, PendingMatch, QueueStats};
use crate::AppState;

/// Request payload for the decision endpoints
///
/// `concept_id` is only read by accept; absent means "create a concept".
/// The body itself may be omitted.
#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    #[serde(default)]
    pub concept_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// GET /api/matches/pending
pub async fn pending_matches(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<PendingMatch>>>> {
    let queue = state.review_queue().get_pending_matches().await?;
    Ok(ApiResponse::ok(format!("{} matches awaiting review", queue.len()), queue))
}

/// GET /api/matches/stats
pub async fn queue_stats(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<QueueStats>>> {
    let stats = state.review_queue().queue_stats().await?;
    Ok(ApiResponse::ok("Queue statistics", stats))
}

/// POST /api/matches/:id/accept
pub async fn accept_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(similarity_id): ApiPath<Uuid>,
    OptionalJson(request): OptionalJson<DecisionRequest>,
) -> ApiResult<Json<ApiResponse<GameSimilarity>>> {
    let similarity = state
        .review_queue()
        .accept_similarity(
            &actor,
            similarity_id,
            ConceptTarget::from(request.concept_id),
            request.notes,
        )
        .await?;
    Ok(ApiResponse::ok("Match accepted", similarity))
}

/// POST /api/matches/:id/reject
pub async fn reject_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(similarity_id): ApiPath<Uuid>,
    OptionalJson(request): OptionalJson<DecisionRequest>,
) -> ApiResult<Json<ApiResponse<GameSimilarity>>> {
    let similarity = state
        .review_queue()
        .reject_similarity(&actor, similarity_id, request.notes)
        .await?;
    Ok(ApiResponse::ok("Match rejected", similarity))
}

/// POST /api/matches/:id/postpone
pub async fn postpone_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    ApiPath(similarity_id): ApiPath<Uuid>,
    OptionalJson(request): OptionalJson<DecisionRequest>,
) -> ApiResult<Json<ApiResponse<GameSimilarity>>> {
    let similarity = state
        .review_queue()
        .postpone_similarity(&actor, similarity_id, request.notes)
        .await?;
    Ok(ApiResponse::ok("Match postponed", similarity))
}

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/api/matches/pending", get(pending_matches))
        .route("/api/matches/stats", get(queue_stats))
        .route("/api/matches/:id/accept", post(accept_match))
        .route("/api/matches/:id/reject", post(reject_match))
        .route("/api/matches/:id/postpone", post(postpone_match))
}
