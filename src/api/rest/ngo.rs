use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Serialize;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::donation::{DeliveryMethodRequest, Donation};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ngo/dashboard", get(dashboard))
        .route("/ngo/donations/:id/accept", post(accept_donation))
        .route("/ngo/donations/:id/delivery-method", post(set_delivery_method))
}

#[derive(Serialize)]
pub struct DeliveryMethodResponse {
    pub donation: Donation,
    pub pending_count: usize,
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Donation>>, AppError> {
    let donations = state.coordinator.ngo_dashboard(&actor)?;
    Ok(Json(donations))
}

async fn accept_donation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Donation>, AppError> {
    let donation = state.coordinator.accept_donation(&actor, id)?;
    Ok(Json(donation))
}

async fn set_delivery_method(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<DeliveryMethodRequest>,
) -> Result<Json<DeliveryMethodResponse>, AppError> {
    let donation = state.coordinator.set_delivery_method(&actor, id, payload)?;
    let pending_count = state.coordinator.pending_count()?;

    Ok(Json(DeliveryMethodResponse {
        donation,
        pending_count,
    }))
}
