//! HTTP API handlers for alaab-review

pub mod auth;
pub mod concepts;
pub mod extract;
pub mod games;
pub mod health;
pub mod matches;

pub use auth::actor_middleware;
pub use concepts::concept_routes;
pub use games::game_routes;
pub use health::health_routes;
pub use matches::match_routes;
