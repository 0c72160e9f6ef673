//! Parser failures. Each variant keeps the cause reported by the format library.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Word binary error: {0}")]
    Word(String),

    #[error("Document part missing: {0}")]
    MissingPart(String),

    #[error("Unrecognized office document")]
    UnknownOffice,

    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Extraction task failed: {0}")]
    Join(String),
}
