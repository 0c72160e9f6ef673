//! AI chat over a single note.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use notesage_chat::{
    build_context_with, AttachmentContext, ChatError, ChatRequest, ChatResponse, ContextBudget,
    GeminiClient, NoteContext,
};
use notesage_store::Note;

use super::notes::note_not_found;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/status", get(status))
        .route("/ai/chat", post(chat))
}

/// Context material for a stored note: attachments in upload order.
pub(crate) fn note_context(note: &Note) -> NoteContext {
    NoteContext {
        title: Some(note.title.clone()),
        folder: Some(note.folder.clone()),
        content: Some(note.content.clone()),
        attachments: note
            .attachments
            .iter()
            .map(|a| AttachmentContext {
                name: a.name.clone(),
                extracted_text: a.extracted_text.clone(),
            })
            .collect(),
    }
}

/// GET /api/ai/status
async fn status(State(state): State<Arc<AppState>>, _auth: AuthUser) -> Json<Value> {
    Json(json!({
        "available": state.llm_config.is_configured(),
        "model": state.llm_config.gemini_model,
    }))
}

/// POST /api/ai/chat
async fn chat(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req
        .message()
        .ok_or_else(|| ApiError::BadRequest("Message is required".into()))?;

    let client = match GeminiClient::from_config(state.http.clone(), &state.llm_config) {
        Ok(client) => client,
        Err(ChatError::MissingApiKey) => {
            error!("GEMINI_API_KEY is not set");
            return Err(ApiError::Internal(
                "AI Configuration error: API Key missing".into(),
            ));
        }
        Err(e) => return Err(ApiError::Ai(e.to_string())),
    };

    let note = match req.note_id.as_deref() {
        Some(id) => {
            let note = state
                .store
                .get_note(&auth.user_id, id)?
                .ok_or_else(note_not_found)?;
            note_context(&note)
        }
        None => req.context.clone().unwrap_or_default(),
    };
    info!(
        "AI request for note {:?} ({} attachments)",
        note.title,
        note.attachments.len()
    );

    let context = build_context_with(&note, ContextBudget::from(&state.config.limits));
    debug!("Context length: {} chars", context.chars().count());

    match client.generate(&context, message).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(e) => {
            error!("AI error: {}", e);
            Err(ApiError::Ai(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;
    use notesage_chat::build_context;

    fn with_key(key: &str) -> Option<String> {
        match key {
            "GEMINI_API_KEY" => Some("test-key".into()),
            // nothing listens on the discard port
            "GEMINI_API_BASE" => Some("http://127.0.0.1:9/v1beta".into()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_message_required() {
        let app = TestApp::new();
        let (status, body) = app
            .json("POST", "/api/ai/chat", Some(json!({"context": {"title": "t"}})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Message is required");
    }

    #[tokio::test]
    async fn test_malformed_body_uses_message_shape() {
        let app = TestApp::new();
        let (status, body) = app
            .json("POST", "/api/ai/chat", Some(json!({"message": 5})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, body) = app.json("POST", "/api/notes", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let app = TestApp::new();
        let (status, body) = app
            .json("POST", "/api/ai/chat", Some(json!({"message": "hi"})))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "AI Configuration error: API Key missing");
    }

    #[tokio::test]
    async fn test_unknown_note() {
        let app = TestApp::with_env(with_key);
        let (status, body) = app
            .json("POST", "/api/ai/chat", Some(json!({"message": "hi", "noteId": "nope"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Note not found");
    }

    #[tokio::test]
    async fn test_provider_failure_shape() {
        let app = TestApp::with_env(with_key);
        let (status, body) = app
            .json("POST", "/api/ai/chat", Some(json!({"message": "hi", "context": {}})))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to generate AI response");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_status_reports_key() {
        let app = TestApp::with_env(with_key);
        let (status, body) = app.json("GET", "/api/ai/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["available"], true);
    }

    #[tokio::test]
    async fn test_stored_note_context_matches_upload_order() {
        let app = TestApp::new();
        let (_, note) = app
            .json("POST", "/api/notes", Some(json!({"title": "Trip", "content": "Pack"})))
            .await;
        let id = note["_id"].as_str().unwrap();
        let uri = format!("/api/notes/{}/attachments", id);
        app.upload("POST", &uri, "file", "a.txt", "text/plain", b"Hello").await;
        app.upload("POST", &uri, "file", "b.xyz", "application/octet-stream", b"??").await;

        let stored = app.state.store.get_note(&app.user_id, id).unwrap().unwrap();
        let ctx = build_context(&note_context(&stored));
        assert!(ctx.starts_with("### Title: Trip\n\n### Folder: General\n\n### Content:\nPack\n\n"));
        assert!(ctx.contains(
            "#### Attachment 1: a.txt\n(Extracted Content):\nHello\n---\n\
             \n#### Attachment 2: b.xyz\n(No text extracted or unsupported format)\n---\n"
        ));
    }
}
