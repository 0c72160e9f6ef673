//! Authentication: Google sign-in and bearer-session extraction.
//!
//! Handlers that need a user take an [`AuthUser`] argument. The session is
//! resolved per request from the `Authorization` header and handed to the
//! handler explicitly; nothing about the caller is kept in process state.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;
use tracing::{debug, warn};

use notesage_store::UserProfile;

use crate::error::ApiError;
use crate::state::AppState;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".into()))?;

        match state.store.resolve_session(token)? {
            Some(user_id) => Ok(AuthUser { user_id }),
            None => {
                debug!("Rejected unknown or expired session token");
                Err(ApiError::Unauthorized("Token is not valid".into()))
            }
        }
    }
}

/// Claims returned by Google's tokeninfo endpoint.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Verifies Google ID tokens against the configured client id.
#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: Option<String>,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self {
            http,
            client_id,
            tokeninfo_url: TOKENINFO_URL.to_string(),
        }
    }

    /// Verify an ID token and return the profile it asserts.
    pub async fn verify(&self, credential: &str) -> Result<UserProfile, ApiError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ApiError::Internal("Google login is not configured".into()))?;

        let response = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("Google verification failed: {}", e)))?;

        if !response.status().is_success() {
            warn!("Google rejected ID token ({})", response.status());
            return Err(invalid_token());
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            warn!("Unreadable tokeninfo response: {}", e);
            invalid_token()
        })?;

        check_claims(&info, client_id)?;

        Ok(UserProfile {
            google_id: info.sub,
            name: info.name.unwrap_or_else(|| info.email.clone()),
            email: info.email,
            picture: info.picture,
        })
    }
}

fn invalid_token() -> ApiError {
    ApiError::Unauthorized("Invalid Google token".into())
}

fn check_claims(info: &TokenInfo, client_id: &str) -> Result<(), ApiError> {
    if info.aud != client_id {
        warn!("Google token issued for another audience");
        return Err(invalid_token());
    }
    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        warn!("Google token from unexpected issuer {}", info.iss);
        return Err(invalid_token());
    }
    if info.sub.is_empty() {
        return Err(invalid_token());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, iss: &str) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            iss: iss.into(),
            sub: "10769150350006150715113082367".into(),
            email: "ada@example.com".into(),
            name: Some("Ada".into()),
            picture: None,
        }
    }

    #[test]
    fn test_claims_accepted() {
        assert!(check_claims(&info("client-1", "accounts.google.com"), "client-1").is_ok());
        assert!(check_claims(&info("client-1", "https://accounts.google.com"), "client-1").is_ok());
    }

    #[test]
    fn test_wrong_audience_or_issuer_rejected() {
        assert!(matches!(
            check_claims(&info("client-2", "accounts.google.com"), "client-1"),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(check_claims(&info("client-1", "evil.example.com"), "client-1").is_err());
    }

    #[test]
    fn test_tokeninfo_payload() {
        let parsed: TokenInfo = serde_json::from_str(
            r#"{"aud":"c","iss":"accounts.google.com","sub":"42","email":"a@b.c","email_verified":"true","exp":"1700000000"}"#,
        )
        .unwrap();
        assert_eq!(parsed.sub, "42");
        assert!(parsed.name.is_none());
    }
}
