use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, info, warn};

use crate::models::actor::Actor;
use crate::state::AppState;

/// Identity is checked before the upgrade so unauthenticated callers get 401.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| stream_notifications(socket, state, actor))
}

async fn stream_notifications(socket: WebSocket, state: Arc<AppState>, actor: Actor) {
    info!(user_id = %actor.id, role = %actor.role, "notification feed opened");

    let (mut sender, mut receiver) = socket.split();
    let mut feed = BroadcastStream::new(state.notifications.subscribe())
        .filter_map(move |item| {
            let wanted = match &item {
                Ok(notification) => notification.user_id == actor.id,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification feed lagging; messages dropped");
                    false
                }
            };
            futures::future::ready(if wanted { item.ok() } else { None })
        })
        .boxed();

    let mut push = tokio::spawn(async move {
        while let Some(notification) = feed.next().await {
            let json = match serde_json::to_string(&notification) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize notification for feed");
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut drain = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
            debug!("ignoring inbound feed message");
        }
    });

    tokio::select! {
        _ = &mut push => drain.abort(),
        _ = &mut drain => push.abort(),
    }

    info!("notification feed closed");
}
