//! NoteSage: note-taking backend with attachment text extraction and AI chat.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod error;
mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("NOTESAGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = &dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                println!("NoteSage: notes, attachments and AI chat server");
                println!();
                println!("Usage: notesage [command]");
                println!();
                println!("Commands:");
                println!("  (none)    Start the server");
                println!("  help      Show this help message");
                println!();
                println!("Environment:");
                println!("  PORT, NOTESAGE_DATA_DIR, GOOGLE_CLIENT_ID, GEMINI_API_KEY, GEMINI_MODEL,");
                println!("  GEMINI_API_BASE, SESSION_TTL_DAYS, EXTRACTION_TIMEOUT_SECS, MAX_ATTACHMENT_CHARS,");
                println!("  MAX_CONTEXT_CHARS");
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'notesage help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = notesage_core::NoteSageConfig::from_env(&data_dir)?;
    let port = config.port;
    if config.google_client_id.is_none() {
        warn!("GOOGLE_CLIENT_ID is not set; sign-in is disabled");
    }

    let store = notesage_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let purged = store
        .purge_expired_sessions()
        .map_err(|e| anyhow::anyhow!("Failed to purge sessions: {}", e))?;
    if purged > 0 {
        info!("Purged {} expired sessions", purged);
    }

    let state = Arc::new(AppState::new(config, store));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("NoteSage server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
