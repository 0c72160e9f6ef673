//! NoteSage Ingest: turns uploaded attachments into plain text for the AI context.

pub mod error;
pub mod extract;
pub mod file;

pub use error::ParseError;
pub use extract::{Extraction, Extractor, StoredFile};
pub use file::{detect_format, FormatTag};
