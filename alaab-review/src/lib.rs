//! alaab-review library interface
//!
//! Similarity matching and the editorial review workflow for the Alaab
//! heritage games catalogue. Exposes the services and router for the binary
//! and for integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod normalizer;
pub mod permissions;
pub mod scoring;
pub mod services;

pub use crate::error::{ApiError, ApiResponse, ApiResult};

use alaab_common::config::MatchingConfig;
use alaab_common::events::EventBus;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{ConceptService, GameService, ReviewQueue, ReviewWorkflow};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    /// Validated scoring weights and threshold
    pub matching: Arc<MatchingConfig>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, matching: MatchingConfig) -> Self {
        Self {
            db,
            event_bus,
            matching: Arc::new(matching),
            startup_time: Utc::now(),
        }
    }

    pub fn games(&self) -> GameService {
        GameService::new(self.db.clone(), self.matching.clone(), self.event_bus.clone())
    }

    pub fn review_queue(&self) -> ReviewQueue {
        ReviewQueue::new(self.db.clone(), self.event_bus.clone())
    }

    pub fn concepts(&self) -> ConceptService {
        ConceptService::new(self.db.clone(), self.event_bus.clone())
    }

    pub fn workflow(&self) -> ReviewWorkflow {
        ReviewWorkflow::new(self.db.clone(), self.event_bus.clone())
    }
}

/// Build application router
///
/// Everything under `/api` requires a resolved caller; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::game_routes())
        .merge(api::match_routes())
        .merge(api::concept_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::actor_middleware,
        ));

    let public = Router::new().merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .fallback(error::route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
