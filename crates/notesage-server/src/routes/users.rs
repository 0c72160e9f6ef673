//! User profile and folder routes.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use notesage_core::config::MAX_PICTURE_BYTES;

use super::{dotted_extension, now_millis, remove_stored_file};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

const PICTURE_TYPES: &[&str] = &["jpeg", "jpg", "png", "webp"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/me", get(me))
        .route(
            "/users/profile",
            put(update_profile).layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES + 64 * 1024)),
        )
        .route("/users/folders", post(add_folder))
        .route("/users/folders/{name}", delete(remove_folder))
}

/// GET /api/users/me
async fn me(State(state): State<Arc<AppState>>, auth: AuthUser) -> Result<Json<Value>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "name": user.name,
        "email": user.email,
        "picture": user.picture,
        "folders": user.folders,
    })))
}

/// Both the MIME type and the extension must name an accepted image type.
fn is_accepted_picture(filename: &str, mime: &str) -> bool {
    let ext = dotted_extension(filename).to_lowercase();
    let mime = mime.to_lowercase();
    let ext_ok = PICTURE_TYPES.iter().any(|t| ext == format!(".{}", t));
    let mime_ok = PICTURE_TYPES.iter().any(|t| mime.contains(t));
    ext_ok && mime_ok
}

/// PUT /api/users/profile: multipart, optional field `picture`.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("picture") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mime = field.content_type().unwrap_or_default().to_string();
        if !is_accepted_picture(&filename, &mime) {
            return Err(ApiError::BadRequest(
                "Only images (jpeg, jpg, png, webp) are allowed".into(),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > MAX_PICTURE_BYTES {
            return Err(ApiError::PayloadTooLarge("File too large".into()));
        }

        let stored = format!("{}-{}{}", auth.user_id, now_millis(), dotted_extension(&filename));
        tokio::fs::write(state.config.data_paths.uploads.join(&stored), &bytes).await?;

        let previous = user.picture.clone();
        user = state
            .store
            .set_user_picture(&auth.user_id, &format!("/uploads/{}", stored))?;

        // only pictures we stored ourselves are ours to delete
        if let Some(old) = previous.as_deref().and_then(|p| p.strip_prefix('/')) {
            if old.starts_with("uploads/") && !old.contains("..") {
                remove_stored_file(&state, old).await;
            }
        }
        info!("Updated picture for user {}", auth.user_id);
        break;
    }

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": {
            "name": user.name,
            "email": user.email,
            "picture": user.picture,
        },
    })))
}

pub(crate) fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("File too large".into())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewFolder {
    #[serde(default)]
    folder_name: String,
}

/// POST /api/users/folders
async fn add_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(body): ApiJson<NewFolder>,
) -> Result<Json<Value>, ApiError> {
    let folders = state.store.add_folder(&auth.user_id, &body.folder_name)?;
    Ok(Json(json!({ "folders": folders })))
}

/// DELETE /api/users/folders/:name: notes in the folder move to the default one.
async fn remove_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let folders = state.store.remove_folder(&auth.user_id, &name)?;
    Ok(Json(json!({ "folders": folders })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::*;
    use axum::http::StatusCode;

    #[test]
    fn test_picture_filter() {
        assert!(is_accepted_picture("me.PNG", "image/png"));
        assert!(is_accepted_picture("me.jpg", "image/jpeg"));
        assert!(!is_accepted_picture("me.gif", "image/gif"));
        assert!(!is_accepted_picture("me.png", "text/plain"));
        assert!(!is_accepted_picture("png", "image/png"));
    }

    #[tokio::test]
    async fn test_me() {
        let app = TestApp::new();
        let (status, body) = app.json("GET", "/api/users/me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ada");
        assert_eq!(body["email"], "ada@example.com");
        assert!(body["folders"].is_array());
    }

    #[tokio::test]
    async fn test_profile_picture_upload() {
        let app = TestApp::new();
        let (status, body) = app
            .upload("PUT", "/api/users/profile", "picture", "me.png", "image/png", b"\x89PNG fake")
            .await;
        assert_eq!(status, StatusCode::OK);
        let picture = body["user"]["picture"].as_str().unwrap();
        assert!(picture.starts_with(&format!("/uploads/{}-", app.user_id)));
        assert!(picture.ends_with(".png"));

        let stored = app.state.config.data_paths.resolve(picture.trim_start_matches('/'));
        assert_eq!(std::fs::read(stored).unwrap(), b"\x89PNG fake");
    }

    #[tokio::test]
    async fn test_profile_rejects_non_image() {
        let app = TestApp::new();
        let (status, body) = app
            .upload("PUT", "/api/users/profile", "picture", "notes.txt", "text/plain", b"hi")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Only images (jpeg, jpg, png, webp) are allowed");
    }

    #[tokio::test]
    async fn test_folders_add_and_remove() {
        let app = TestApp::new();
        let (status, body) = app
            .json("POST", "/api/users/folders", Some(serde_json::json!({"folderName": "Work"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["folders"].as_array().unwrap().iter().any(|f| f == "Work"));

        let (_, note) = app
            .json("POST", "/api/notes", Some(serde_json::json!({"title": "t", "folder": "Work"})))
            .await;

        let (status, body) = app.json("DELETE", "/api/users/folders/Work", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["folders"].as_array().unwrap().iter().any(|f| f == "Work"));

        let uri = format!("/api/notes/{}", note["_id"].as_str().unwrap());
        let (_, note) = app.json("GET", &uri, None).await;
        assert_eq!(note["folder"], "General");
    }

    #[tokio::test]
    async fn test_default_folder_cannot_be_removed() {
        let app = TestApp::new();
        let (status, _) = app.json("DELETE", "/api/users/folders/General", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
