use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::donation::{Donation, DonationFilter, NewDonation};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/donations", post(record_donation).get(list_donations))
        .route("/donations/:id", get(get_donation))
}

async fn record_donation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiJson(payload): ApiJson<NewDonation>,
) -> Result<Json<Donation>, AppError> {
    let donation = state.coordinator.record_donation(&actor, payload)?;
    Ok(Json(donation))
}

async fn list_donations(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiQuery(filter): ApiQuery<DonationFilter>,
) -> Result<Json<Vec<Donation>>, AppError> {
    let donations = state.coordinator.list_donations(&actor, filter)?;
    Ok(Json(donations))
}

async fn get_donation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Donation>, AppError> {
    let donation = state.coordinator.donation(&actor, id)?;
    Ok(Json(donation))
}
