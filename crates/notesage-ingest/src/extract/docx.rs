//! Word adapter: body text of `word/document.xml`, or of the binary
//! `WordDocument` stream for Word 97-2003 files.

use std::fs::File;
use std::path::Path;

use zip::ZipArchive;

use super::doc;
use super::xml::{open_archive, paragraph_text, read_part};
use crate::ParseError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph text from a Word document, whichever container it uses.
pub fn extract(path: &Path) -> Result<String, ParseError> {
    if doc::is_compound_file(path)? {
        return doc::extract(path);
    }
    let mut archive = open_archive(path)?;
    extract_archive(&mut archive)
}

pub(crate) fn extract_archive(archive: &mut ZipArchive<File>) -> Result<String, ParseError> {
    let xml = read_part(archive, DOCUMENT_PART)?
        .ok_or_else(|| ParseError::MissingPart(DOCUMENT_PART.to_string()))?;
    paragraph_text(&xml)
}
