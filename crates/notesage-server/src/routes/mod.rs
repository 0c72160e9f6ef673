//! HTTP route handlers.
//!
//! Everything under `/api` except `/api/auth` requires a bearer session.

pub mod ai;
pub mod attachments;
pub mod auth;
pub mod notes;
pub mod users;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.data_paths.uploads);

    Router::new()
        .route("/", get(|| async { "NoteSage server running" }))
        .nest("/api", api_routes())
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(notes::routes())
        .merge(attachments::routes())
        .merge(ai::routes())
}

/// Milliseconds since the Unix epoch, used in stored filenames.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The extension of an uploaded filename, with its dot, or "".
pub(crate) fn dotted_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Remove a stored upload. A file already gone is not an error.
pub(crate) async fn remove_stored_file(state: &AppState, stored: &str) {
    let path = state.config.data_paths.resolve(stored);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    #[tokio::test]
    async fn test_root_banner() {
        let app = TestApp::new();
        let resp = app
            .send(Request::get("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_session() {
        let app = TestApp::new();
        for uri in ["/api/notes", "/api/users/me"] {
            let resp = app.send(Request::get(uri).body(Body::empty()).unwrap()).await;
            let (status, body) = read_json(resp).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert!(body["message"].is_string());
        }

        let resp = app
            .send(
                Request::get("/api/notes")
                    .header("authorization", "Bearer not-a-session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_dotted_extension() {
        assert_eq!(super::dotted_extension("report.PDF"), ".PDF");
        assert_eq!(super::dotted_extension("../../etc/x.txt"), ".txt");
        assert_eq!(super::dotted_extension("README"), "");
    }
}
