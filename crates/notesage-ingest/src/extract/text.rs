//! Plain-text adapter: the file as UTF-8, untouched.

use std::path::Path;

use crate::ParseError;

/// Read the file verbatim. Invalid UTF-8 sequences become U+FFFD.
pub fn extract(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Title\n\n  indented\tline\r\n").unwrap();
        assert_eq!(extract(&path).unwrap(), "# Title\n\n  indented\tline\r\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.txt");
        std::fs::write(&path, b"ok \xff done").unwrap();
        assert_eq!(extract(&path).unwrap(), "ok \u{FFFD} done");
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let result = extract(Path::new("/nonexistent/file.txt"));
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
