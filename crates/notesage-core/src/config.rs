//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Largest accepted attachment upload (20 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;
/// Largest accepted profile picture (5 MiB).
pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

pub const DEFAULT_PORT: u16 = 5000;

/// Paths to all NoteSage data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`). Stored attachment paths are relative to it.
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// Public uploads directory, served at `/uploads` (`data/uploads/`).
    pub uploads: PathBuf,
    /// Attachment files (`data/uploads/attachments/`).
    pub attachments: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let uploads = root.join("uploads");
        let paths = Self {
            db: root.join("db"),
            attachments: uploads.join("attachments"),
            uploads,
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Create all required directories.
    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.uploads)?;
        std::fs::create_dir_all(&self.attachments)?;
        Ok(())
    }

    /// Resolve a stored (root-relative) path to an absolute filesystem path.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let candidate = Path::new(stored);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };
        if joined.is_absolute() {
            joined
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&joined))
                .unwrap_or(joined)
        }
    }

    /// Root-relative path for a file inside the attachments directory.
    pub fn attachment_relative(&self, file_name: &str) -> String {
        format!("uploads/attachments/{}", file_name)
    }
}

/// Extraction and prompt-size limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Deadline for a single attachment's text extraction.
    pub extraction_timeout: Duration,
    /// Per-attachment cap on extracted characters placed in the AI context.
    pub max_attachment_chars: usize,
    /// Total cap on extracted characters placed in the AI context.
    pub max_context_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            extraction_timeout: Duration::from_secs(60),
            max_attachment_chars: 200_000,
            max_context_chars: 1_000_000,
        }
    }
}

/// Top-level NoteSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteSageConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Audience expected on Google ID tokens. Login is refused when unset.
    pub google_client_id: Option<String>,
    /// Session token lifetime in days.
    pub session_ttl_days: i64,
    pub limits: Limits,
}

impl NoteSageConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(data_dir: impl AsRef<Path>, lookup: F) -> std::io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let port = lookup("PORT")
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let defaults = Limits::default();
        let limits = Limits {
            extraction_timeout: parsed("EXTRACTION_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.extraction_timeout),
            max_attachment_chars: parsed("MAX_ATTACHMENT_CHARS")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_attachment_chars),
            max_context_chars: parsed("MAX_CONTEXT_CHARS")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_context_chars),
        };

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            google_client_id: lookup("GOOGLE_CLIENT_ID").filter(|v| !v.trim().is_empty()),
            session_ttl_days: parsed("SESSION_TTL_DAYS").map(|d| d as i64).unwrap_or(7),
            limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.db.is_dir());
        assert!(paths.uploads.is_dir());
        assert!(paths.attachments.is_dir());
        assert!(paths.attachments.starts_with(&paths.uploads));
    }

    #[test]
    fn test_resolve_relative_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        let rel = paths.attachment_relative("n1-123.pdf");
        assert_eq!(rel, "uploads/attachments/n1-123.pdf");
        let abs = paths.resolve(&rel);
        assert!(abs.is_absolute());
        assert_eq!(abs, paths.attachments.join("n1-123.pdf"));
    }

    #[test]
    fn test_defaults_without_env() {
        let dir = tempfile::tempdir().unwrap();
        let config = NoteSageConfig::from_lookup(dir.path(), |_| None).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl_days, 7);
        assert!(config.google_client_id.is_none());
        assert_eq!(config.limits.extraction_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<&str, &str> = [
            ("PORT", "8080"),
            ("GOOGLE_CLIENT_ID", "client-123"),
            ("EXTRACTION_TIMEOUT_SECS", "5"),
            ("MAX_ATTACHMENT_CHARS", "1000"),
            ("SESSION_TTL_DAYS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config =
            NoteSageConfig::from_lookup(dir.path(), |k| vars.get(k).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.google_client_id.as_deref(), Some("client-123"));
        assert_eq!(config.limits.extraction_timeout, Duration::from_secs(5));
        assert_eq!(config.limits.max_attachment_chars, 1000);
        assert_eq!(config.session_ttl_days, 7);
    }
}
