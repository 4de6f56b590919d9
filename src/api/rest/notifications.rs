use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::engine::coordinator::Profile;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/profile", get(profile))
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Json<Vec<Notification>> {
    Json(state.coordinator.notifications_for(&actor))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Profile>, AppError> {
    let profile = state.coordinator.profile(&actor)?;
    Ok(Json(profile))
}
