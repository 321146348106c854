//! Direct message endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, put},
    Json, Router,
};

use super::error::{bad_request, store_error, ApiError};
use super::routes::AppState;
use super::types::{CountResponse, MarkReadRequest, SendMessageRequest, UserQuery};
use crate::events::ChangeEvent;
use crate::messaging::{unread_count, Message};
use crate::util;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_messages).post(send_message))
        .route("/read", put(mark_read))
        .route("/unread", get(unread))
}

/// GET /api/messages?userId= - Everything the user sent or received, oldest first.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    state
        .store
        .messages_for(&query.user_id)
        .await
        .map(Json)
        .map_err(store_error)
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(bad_request("Message text is required"));
    }
    if req.to_id.trim().is_empty() {
        return Err(bad_request("Recipient is required"));
    }
    let message = Message::new(&req.from_id, &req.to_id, req.text, util::now_millis());
    state
        .store
        .insert_message(&message)
        .await
        .map_err(store_error)?;
    tracing::debug!("Message {} -> {}", message.from_id, message.to_id);
    state.events.publish(ChangeEvent::MessageSent {
        message: message.clone(),
    });
    Ok(Json(message))
}

/// PUT /api/messages/read - Mark what `contactId` sent to `userId` as read.
async fn mark_read(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state
        .store
        .mark_read(&req.user_id, &req.contact_id)
        .await
        .map_err(store_error)?;
    Ok(Json(CountResponse { count }))
}

async fn unread(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CountResponse>, ApiError> {
    let messages = state
        .store
        .messages_for(&query.user_id)
        .await
        .map_err(store_error)?;
    Ok(Json(CountResponse {
        count: unread_count(&messages, &query.user_id),
    }))
}
