//! Extraction orchestrator.
//!
//! Detects the format from the original filename, dispatches to the matching
//! adapter on the blocking pool and guards the call with a deadline. The
//! outcome is always an [`Extraction`]; nothing escapes as an error, so an
//! upload is never aborted by a bad file.

pub mod doc;
pub mod docx;
pub mod office;
pub mod pdf;
pub mod text;
mod xml;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::file::{detect_format, FormatTag};
use crate::ParseError;

/// An uploaded file already written to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Filename as supplied by the client. Drives format detection.
    pub original_name: String,
    /// Where the bytes live, absolute or relative to the extractor's base dir.
    pub stored_path: PathBuf,
}

impl StoredFile {
    pub fn new(original_name: impl Into<String>, stored_path: impl Into<PathBuf>) -> Self {
        Self {
            original_name: original_name.into(),
            stored_path: stored_path.into(),
        }
    }
}

/// Outcome of one extraction.
#[derive(Debug)]
pub enum Extraction {
    /// Non-blank text.
    Text(String),
    /// The adapter succeeded but produced only whitespace.
    Empty,
    /// Extension outside the supported set; the file was not read.
    Unsupported,
    Failed(ParseError),
    TimedOut,
}

impl Extraction {
    fn from_output(output: String) -> Self {
        if output.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(output)
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Empty => "empty",
            Self::Unsupported => "unsupported",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed-out",
        }
    }
}

/// Run the adapter for `format` on `path`, synchronously.
pub fn run_adapter(format: FormatTag, path: &Path) -> Result<String, ParseError> {
    match format {
        FormatTag::Pdf => pdf::extract(path),
        FormatTag::DocxLike => docx::extract(path),
        FormatTag::OfficeOther => office::extract(path),
        FormatTag::PlainText => text::extract(path),
        FormatTag::Unsupported => Ok(String::new()),
    }
}

/// Run a blocking adapter job on the blocking pool with a deadline.
///
/// On expiry the job is left to finish in the background; its result is dropped.
pub(crate) async fn run_guarded<F>(deadline: Duration, job: F) -> Extraction
where
    F: FnOnce() -> Result<String, ParseError> + Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(Ok(output))) => Extraction::from_output(output),
        Ok(Ok(Err(e))) => Extraction::Failed(e),
        Ok(Err(join)) => Extraction::Failed(ParseError::Join(join.to_string())),
        Err(_) => Extraction::TimedOut,
    }
}

/// Turns stored uploads into text.
#[derive(Debug, Clone)]
pub struct Extractor {
    base_dir: PathBuf,
    timeout: Duration,
}

impl Extractor {
    /// `base_dir` anchors relative stored paths; `timeout` bounds each file.
    pub fn new(base_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            base_dir: base_dir.into(),
            timeout,
        }
    }

    /// Absolute path of a stored file.
    pub fn resolve(&self, stored: &Path) -> PathBuf {
        let joined = if stored.is_absolute() {
            stored.to_path_buf()
        } else {
            self.base_dir.join(stored)
        };
        if joined.is_absolute() {
            joined
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&joined))
                .unwrap_or(joined)
        }
    }

    /// Extract text from a stored upload. Never fails.
    pub async fn extract(&self, file: &StoredFile) -> Extraction {
        let path = self.resolve(&file.stored_path);
        let format = detect_format(&file.original_name);

        if !format.is_supported() {
            debug!("Skipping extraction for unsupported file {}", file.original_name);
            return Extraction::Unsupported;
        }

        let start = Instant::now();
        let job_path = path.clone();
        let result = run_guarded(self.timeout, move || run_adapter(format, &job_path)).await;

        match &result {
            Extraction::Failed(e) => warn!(
                "Extraction failed for {} ({}, {}): {}",
                file.original_name,
                path.display(),
                format,
                e
            ),
            Extraction::TimedOut => warn!(
                "Extraction timed out for {} ({}, {}): {}",
                file.original_name,
                path.display(),
                format,
                ParseError::Timeout(self.timeout)
            ),
            other => debug!(
                "Extracted {} as {} in {:?}: {}",
                file.original_name,
                format,
                start.elapsed(),
                other.outcome()
            ),
        }

        result
    }

    /// Extracted text, or `None` for every non-text outcome.
    pub async fn extract_text(&self, file: &StoredFile) -> Option<String> {
        self.extract(file).await.into_text()
    }
}
