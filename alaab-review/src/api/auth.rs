//! Caller identity middleware
//!
//! Identity is owned by the surrounding web application. It forwards the
//! signed-in user's id in `X-User-Id`; this layer resolves it against the
//! users table and hands handlers an [`Actor`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::db::users;
use crate::permissions::Actor;
use crate::{ApiError, AppState};

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Resolve the caller and attach it as an `Extension<Actor>`
///
/// Missing, malformed and unknown ids all yield 401.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = request
        .headers()
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthenticated("Missing X-User-Id header".to_string()))?
        .to_str()
        .map_err(|_| ApiError::Unauthenticated("Malformed X-User-Id header".to_string()))?;

    let user_id = Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::Unauthenticated("Malformed X-User-Id header".to_string()))?;

    let user = users::load_user(&state.db, user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "Request from unknown user");
        ApiError::Unauthenticated("Unknown user".to_string())
    })?;

    request.extensions_mut().insert(Actor::new(user.id, user.role));
    Ok(next.run(request).await)
}
