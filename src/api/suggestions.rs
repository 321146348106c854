//! Suggestion box endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use super::error::{bad_request, not_found, store_error, ApiError};
use super::routes::AppState;
use super::types::{CreateSuggestionRequest, ReplyRequest};
use crate::events::ChangeEvent;
use crate::messaging::{suggestion_reply, Message, Suggestion};
use crate::util;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_suggestions).post(create_suggestion))
        .route("/:id", delete(delete_suggestion))
        .route("/:id/reply", post(reply))
}

async fn list_suggestions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    state.store.list_suggestions().await.map(Json).map_err(store_error)
}

async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSuggestionRequest>,
) -> Result<Json<Suggestion>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(bad_request("Suggestion text is required"));
    }
    let suggestion = Suggestion {
        id: format!("sug-{}", Uuid::new_v4().simple()),
        author_id: req.author_id,
        author_name: req.author_name,
        text: req.text,
        date: util::now_millis(),
    };
    state
        .store
        .insert_suggestion(&suggestion)
        .await
        .map_err(store_error)?;
    tracing::info!("New suggestion {} from {}", suggestion.id, suggestion.author_id);
    state.events.publish(ChangeEvent::SuggestionChanged {
        id: suggestion.id.clone(),
        suggestion: Some(suggestion.clone()),
    });
    Ok(Json(suggestion))
}

async fn delete_suggestion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state
        .store
        .delete_suggestion(&id)
        .await
        .map_err(store_error)?
    {
        return Err(not_found("Suggestion", &id));
    }
    state.events.publish(ChangeEvent::SuggestionChanged {
        id: id.clone(),
        suggestion: None,
    });
    Ok(Json(serde_json::json!({ "deleted": true, "id": id })))
}

/// POST /api/suggestions/:id/reply - Answer the author with a direct message.
async fn reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Message>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(bad_request("Reply text is required"));
    }
    let suggestion = state
        .store
        .get_suggestion(&id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| not_found("Suggestion", &id))?;

    let message = suggestion_reply(&suggestion, &req.from_id, &req.text, util::now_millis());
    state
        .store
        .insert_message(&message)
        .await
        .map_err(store_error)?;
    state.events.publish(ChangeEvent::MessageSent {
        message: message.clone(),
    });
    Ok(Json(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::tests::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn reply_lands_in_authors_inbox() {
        let state = test_state();
        let Json(s) = create_suggestion(
            State(state.clone()),
            Json(CreateSuggestionRequest {
                author_id: "e1".into(),
                author_name: "Ann".into(),
                text: "More plants".into(),
            }),
        )
        .await
        .unwrap();

        let Json(msg) = reply(
            State(state.clone()),
            Path(s.id.clone()),
            Json(ReplyRequest {
                from_id: "dir-1".into(),
                text: "Ordered".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(msg.text, "RE: Suggestion - Ordered");
        let inbox = state.store.messages_for("e1").await.unwrap();
        assert_eq!(inbox.len(), 1);

        let Json(deleted) = delete_suggestion(State(state.clone()), Path(s.id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted["deleted"], true);
        let err = reply(
            State(state),
            Path(s.id),
            Json(ReplyRequest {
                from_id: "dir-1".into(),
                text: "again".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
