//! Shared application state.

use notesage_chat::LLMConfig;
use notesage_core::NoteSageConfig;
use notesage_ingest::Extractor;
use notesage_store::SqliteStore;

use crate::auth::GoogleVerifier;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: NoteSageConfig,
    pub store: SqliteStore,
    pub extractor: Extractor,
    pub llm_config: LLMConfig,
    pub google: GoogleVerifier,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: NoteSageConfig, store: SqliteStore) -> Self {
        let http = reqwest::Client::new();

        let extractor = Extractor::new(
            config.data_paths.root.clone(),
            config.limits.extraction_timeout,
        );

        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        let google = GoogleVerifier::new(http.clone(), config.google_client_id.clone());

        Self {
            config,
            store,
            extractor,
            llm_config,
            google,
            http,
        }
    }

    /// Session lifetime as configured.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.config.session_ttl_days)
    }
}
