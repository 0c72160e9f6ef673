use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("API Key missing")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,
}
