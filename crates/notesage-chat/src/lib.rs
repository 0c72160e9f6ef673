//! NoteSage Chat: grounds a Gemini conversation in one note and its attachments.
//!
//! The note (title, folder, body, extracted attachment text) is flattened into
//! a bounded context string, primed as the first user turn, and the user's
//! question is sent after a fixed model acknowledgement.

pub mod config;
pub mod context;
pub mod error;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use context::{build_context, build_context_with, ContextBudget};
pub use error::ChatError;
pub use providers::GeminiClient;
pub use types::*;
