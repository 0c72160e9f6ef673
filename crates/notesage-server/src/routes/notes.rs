//! Note CRUD routes. Every query is scoped to the caller; a note owned by
//! someone else answers exactly like a missing one.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use notesage_store::{Attachment, NewNote, Note, NoteUpdate};

use super::remove_stored_file;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note).delete(delete_notes))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
}

pub(crate) fn note_not_found() -> ApiError {
    ApiError::NotFound("Note not found".into())
}

/// GET /api/notes: most recently updated first.
async fn list_notes(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<Note>>, ApiError> {
    Ok(Json(state.store.list_notes(&auth.user_id)?))
}

/// GET /api/notes/:id
async fn get_note(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    state
        .store
        .get_note(&auth.user_id, &id)?
        .map(Json)
        .ok_or_else(note_not_found)
}

/// POST /api/notes
async fn create_note(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<NewNote>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.store.create_note(&auth.user_id, body)?;
    debug!("Created note {}", note.id);
    Ok((StatusCode::CREATED, Json(note)))
}

/// PATCH /api/notes/:id
async fn update_note(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<NoteUpdate>,
) -> Result<Json<Note>, ApiError> {
    state
        .store
        .update_note(&auth.user_id, &id, body)?
        .map(Json)
        .ok_or_else(note_not_found)
}

async fn remove_files(state: &AppState, attachments: &[Attachment]) {
    for attachment in attachments {
        remove_stored_file(state, &attachment.path).await;
    }
}

/// DELETE /api/notes/:id: attachment files go with it.
async fn delete_note(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let attachments = state
        .store
        .delete_note(&auth.user_id, &id)?
        .ok_or_else(note_not_found)?;
    remove_files(&state, &attachments).await;
    Ok(Json(json!({ "message": "Note deleted" })))
}

#[derive(Debug, Deserialize)]
struct BulkDelete {
    count: Option<String>,
}

/// DELETE /api/notes?count=N: the N oldest notes, or all of them without `count`.
async fn delete_notes(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<BulkDelete>,
) -> Result<Json<Value>, ApiError> {
    let count = match query.count.as_deref().filter(|c| !c.is_empty()) {
        Some(raw) => Some(
            raw.trim()
                .parse::<usize>()
                .map_err(|_| ApiError::BadRequest("count must be a non-negative integer".into()))?,
        ),
        None => None,
    };

    let (deleted, attachments) = state.store.delete_notes(&auth.user_id, count)?;
    remove_files(&state, &attachments).await;

    let message = match count {
        Some(_) => format!("{} oldest notes deleted", deleted),
        None => "All notes deleted".to_string(),
    };
    Ok(Json(json!({ "message": message, "deleted": deleted })))
}
