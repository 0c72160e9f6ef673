//! Chat request/response types matching the HTTP API surface.

use serde::{Deserialize, Serialize};

/// Incoming chat request.
///
/// `noteId` takes precedence over an inline `context`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<NoteContext>,
    #[serde(default, rename = "noteId")]
    pub note_id: Option<String>,
}

impl ChatRequest {
    /// The question, if one was actually asked.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

/// The note material a conversation is grounded in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteContext {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentContext>,
}

/// One attachment as seen by the model: its name and whatever text was extracted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentContext {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "extractedText")]
    pub extracted_text: Option<String>,
}

/// Successful chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// One turn of a Gemini conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: &'static str,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_client_json() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message":"Summarize","context":{"title":"T","attachments":[{"name":"a.pdf","extractedText":"Hello"},{"name":"b.xyz"}]}}"#,
        )
        .unwrap();
        assert_eq!(req.message(), Some("Summarize"));
        let ctx = req.context.unwrap();
        assert_eq!(ctx.title.as_deref(), Some("T"));
        assert!(ctx.folder.is_none());
        assert_eq!(ctx.attachments[0].extracted_text.as_deref(), Some("Hello"));
        assert!(ctx.attachments[1].extracted_text.is_none());
    }

    #[test]
    fn test_blank_message_is_missing() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"","noteId":"n1"}"#).unwrap();
        assert_eq!(req.message(), None);
        assert_eq!(req.note_id.as_deref(), Some("n1"));
        assert_eq!(ChatRequest::default().message(), None);
    }
}
