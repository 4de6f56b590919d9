use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::extract::{ApiPath, ApiQuery};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::delivery::{AcceptedDelivery, PendingDeliveryView, PendingFilter};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries/pending", get(list_pending))
        .route("/deliveries/pending/:id/accept", post(accept_delivery))
        .route("/deliveries/accepted", get(list_accepted))
}

#[derive(Deserialize)]
pub struct AcceptedQuery {
    pub agent_id: Option<String>,
}

async fn list_pending(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<PendingFilter>,
) -> Result<Json<Vec<PendingDeliveryView>>, AppError> {
    let pending = state.coordinator.list_pending(&actor, &filter)?;
    Ok(Json(pending))
}

async fn accept_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AcceptedDelivery>, AppError> {
    let accepted = state.coordinator.accept_delivery(&actor, id)?;
    Ok(Json(accepted))
}

async fn list_accepted(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiQuery(query): ApiQuery<AcceptedQuery>,
) -> Result<Json<Vec<AcceptedDelivery>>, AppError> {
    let accepted = state
        .coordinator
        .list_accepted(&actor, query.agent_id.as_deref())?;
    Ok(Json(accepted))
}
