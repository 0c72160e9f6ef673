//! Data types for users, notes and attachments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Folder every note belongs to unless told otherwise.
pub const DEFAULT_FOLDER: &str = "General";
/// Title given to notes created without one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// A user row. Identified externally by their Google subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub google_id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    pub folders: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields asserted by the identity provider at login.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub google_id: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// A file stored against a note.
///
/// `extracted_text` is either a non-empty string or `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "_id")]
    pub id: String,
    /// Original filename as uploaded.
    pub name: String,
    /// Public URL under `/uploads`.
    pub url: String,
    /// Storage path relative to the data root.
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub extracted_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A note with its attachments in upload order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub content: String,
    pub folder: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Owning user id.
    pub user: String,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a note.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewNote {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Partial update of a note; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.folder.is_none()
            && self.tags.is_none()
            && self.summary.is_none()
    }
}

/// Metadata for an attachment about to be appended to a note.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub name: String,
    pub url: String,
    pub path: String,
    pub size: i64,
    pub mime_type: String,
    pub extracted_text: Option<String>,
}

/// Normalize tags into a set: trimmed, non-empty, first occurrence wins.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(|t| t.to_string())
        .collect()
}

/// Collapse extractor output so that only non-blank text is ever stored.
pub fn normalize_extracted(text: Option<String>) -> Option<String> {
    text.filter(|t| !t.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_dedupes() {
        let tags = vec![
            "rust".to_string(),
            " rust ".to_string(),
            "".to_string(),
            "notes".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["rust", "notes"]);
    }

    #[test]
    fn test_normalize_extracted() {
        assert_eq!(normalize_extracted(None), None);
        assert_eq!(normalize_extracted(Some("   \n".into())), None);
        assert_eq!(normalize_extracted(Some("x".into())), Some("x".into()));
    }

    #[test]
    fn test_note_update_is_empty() {
        assert!(NoteUpdate::default().is_empty());
        let update = NoteUpdate {
            folder: Some("Work".into()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
