//! Gemini `generateContent` client.
//!
//! Non-streaming: the whole answer is returned at once.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::LLMConfig;
use crate::error::ChatError;
use crate::types::Turn;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_PROMPT: &str = "You are a document comprehension engine. You read and reason over \
the knowledge contained in a user's note and its attachments (PDFs, slide decks, Word files, \
spreadsheets and plain text) after they have been converted to text. Recognize their structure: \
titles, headings, sections, slide order, bullet points, tables and references. Track concepts \
across pages and slides. Answer questions and write summaries strictly grounded in the provided \
material, treating it as the single source of truth. Explain complex ideas clearly and never \
invent information. Extract structured data when asked. Reconstruct meaning from context when the \
text is noisy or imperfectly formatted. Prefer clarity, reliability and faithful understanding \
over speed.";

const ACKNOWLEDGEMENT: &str = "Understood. I have processed the document content and attachments. \
I am ready to answer questions grounded strictly in this information.";

/// The three-turn conversation sent for one question.
pub fn conversation(context: &str, message: &str) -> Vec<Turn> {
    vec![
        Turn {
            role: "user",
            text: format!("{}\n\nHere is the document context:\n{}", SYSTEM_PROMPT, context),
        },
        Turn {
            role: "model",
            text: ACKNOWLEDGEMENT.to_string(),
        },
        Turn {
            role: "user",
            text: message.to_string(),
        },
    ]
}

fn request_body(turns: &[Turn]) -> Value {
    let contents: Vec<Value> = turns
        .iter()
        .map(|t| json!({"role": t.role, "parts": [{"text": t.text}]}))
        .collect();
    json!({ "contents": contents })
}

/// Concatenated text parts of the first candidate.
fn response_text(body: &Value) -> Option<String> {
    let parts = body["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.is_empty()).then_some(text)
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Client for the configured model, or [`ChatError::MissingApiKey`].
    pub fn from_config(client: Client, config: &LLMConfig) -> Result<Self, ChatError> {
        Ok(Self::new(client, config.api_key()?, config.gemini_model.clone())
            .with_base_url(config.api_base.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Ask `message` about `context` and return the model's answer.
    pub async fn generate(&self, context: &str, message: &str) -> Result<String, ChatError> {
        let body = request_body(&conversation(context, message));
        debug!(
            "Gemini request to {} ({} context chars)",
            self.model,
            context.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&raw)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(raw);
            error!("Gemini error {}: {}", status, message);
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: Value = response.json().await?;
        response_text(&parsed).ok_or(ChatError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_turns() {
        let turns = conversation("### Title: T\n\n", "What is this?");
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].role, "user");
        assert!(turns[0].text.starts_with(SYSTEM_PROMPT));
        assert!(turns[0]
            .text
            .ends_with("\n\nHere is the document context:\n### Title: T\n\n"));
        assert_eq!(turns[1].role, "model");
        assert_eq!(turns[1].text, ACKNOWLEDGEMENT);
        assert_eq!(turns[2], Turn { role: "user", text: "What is this?".into() });
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(&conversation("ctx", "q"));
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "q");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let body = json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]}}]
        });
        assert_eq!(response_text(&body).as_deref(), Some("Hello there"));
        assert_eq!(response_text(&json!({"candidates": []})), None);
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = LLMConfig::default();
        assert!(matches!(
            GeminiClient::from_config(Client::new(), &config),
            Err(ChatError::MissingApiKey)
        ));
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(Client::new(), "k", "gemini-flash-latest")
            .with_base_url("http://localhost:9/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-flash-latest:generateContent"
        );
    }
}
