//! Format detection from the original filename.

use std::path::Path;

/// Parser family an attachment is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Pdf,
    DocxLike,
    OfficeOther,
    PlainText,
    Unsupported,
}

impl FormatTag {
    /// Map a bare extension (no dot, any case) to its format.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "doc" | "docx" => Self::DocxLike,
            "ppt" | "pptx" | "xls" | "xlsx" => Self::OfficeOther,
            "txt" | "md" | "json" | "js" | "html" | "css" => Self::PlainText,
            _ => Self::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::DocxLike => "docx-like",
            Self::OfficeOther => "office-other",
            Self::PlainText => "plain-text",
            Self::Unsupported => "unsupported",
        }
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect the format of a file from its name alone. Contents are never inspected.
pub fn detect_format(filename: &str) -> FormatTag {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(FormatTag::from_extension)
        .unwrap_or(FormatTag::Unsupported)
}
