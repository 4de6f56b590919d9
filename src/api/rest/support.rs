use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::extract::ApiJson;
use crate::engine::messages::contact_mail;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chatbot", post(chatbot))
        .route("/contact", post(contact))
}

#[derive(Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
pub struct ContactResponse {
    pub status: &'static str,
}

async fn chatbot(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ChatRequest>,
) -> Json<ChatResponse> {
    let answer = state.chatbot.answer(&payload.question, &state.coordinator);
    Json(ChatResponse { answer })
}

async fn contact(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<ContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    let name = payload.name.trim();
    let email = payload.email.trim();
    let message = payload.message.trim();

    if name.is_empty() || message.is_empty() {
        return Err(AppError::Validation(
            "name and message cannot be empty".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(format!("invalid email: {email}")));
    }

    state
        .mailer
        .send(contact_mail(&state.support_email, name, email, message))
        .await?;

    info!(from = %email, "contact message forwarded");
    Ok(Json(ContactResponse { status: "sent" }))
}
