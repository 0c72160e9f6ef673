//! Sign-in route. Exchanges a Google ID token for a NoteSage session.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiJson};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/google", post(google_login))
}

#[derive(Debug, Deserialize)]
struct GoogleLogin {
    #[serde(default)]
    credential: String,
}

/// POST /api/auth/google: verify the ID token, upsert the user, open a session.
async fn google_login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GoogleLogin>,
) -> Result<Json<Value>, ApiError> {
    if body.credential.is_empty() {
        return Err(ApiError::Unauthorized("Invalid Google token".into()));
    }

    let profile = state.google.verify(&body.credential).await?;
    let user = state.store.upsert_user(&profile)?;
    let token = state.store.create_session(&user.id, state.session_ttl())?;

    let purged = state.store.purge_expired_sessions()?;
    info!("User {} signed in ({} stale sessions purged)", user.id, purged);

    Ok(Json(json!({
        "token": token,
        "user": {
            "name": user.name,
            "email": user.email,
            "picture": user.picture,
        },
    })))
}
