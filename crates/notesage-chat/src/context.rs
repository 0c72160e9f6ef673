//! Context Builder: one note plus its attachments as a single prompt string.
//!
//! Output is deterministic and order-preserving. Only extracted attachment
//! text counts against the budget; header lines are always emitted whole.

use notesage_core::Limits;

use crate::types::NoteContext;

pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Character limits on extracted attachment text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextBudget {
    pub per_attachment: usize,
    pub total: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::from(&Limits::default())
    }
}

impl From<&Limits> for ContextBudget {
    fn from(limits: &Limits) -> Self {
        Self {
            per_attachment: limits.max_attachment_chars,
            total: limits.max_context_chars,
        }
    }
}

/// Build the context with the default budget.
pub fn build_context(note: &NoteContext) -> String {
    build_context_with(note, ContextBudget::default())
}

pub fn build_context_with(note: &NoteContext, budget: ContextBudget) -> String {
    let mut out = String::new();

    out.push_str(&format!("### Title: {}\n\n", or_default(&note.title, "Untitled")));
    out.push_str(&format!("### Folder: {}\n\n", or_default(&note.folder, "General")));
    out.push_str(&format!("### Content:\n{}\n\n", or_default(&note.content, "(Empty)")));

    if note.attachments.is_empty() {
        return out;
    }

    out.push_str("### Attachments:\n");
    let mut remaining = budget.total;
    for (i, att) in note.attachments.iter().enumerate() {
        out.push_str(&format!("\n#### Attachment {}: {}\n", i + 1, att.name));
        match att.extracted_text.as_deref().filter(|t| !t.is_empty()) {
            Some(text) => {
                let cap = budget.per_attachment.min(remaining);
                let (head, cut) = take_chars(text, cap);
                remaining -= head.chars().count();

                out.push_str("(Extracted Content):\n");
                out.push_str(head);
                if cut {
                    out.push_str(TRUNCATION_MARKER);
                }
                out.push_str("\n---\n");
            }
            None => out.push_str("(No text extracted or unsupported format)\n---\n"),
        }
    }

    out
}

fn or_default<'a>(value: &'a Option<String>, fallback: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(fallback)
}

/// The first `max` characters of `text`, and whether anything was cut.
fn take_chars(text: &str, max: usize) -> (&str, bool) {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttachmentContext;

    fn att(name: &str, text: &str) -> AttachmentContext {
        AttachmentContext {
            name: name.into(),
            extracted_text: Some(text.into()),
        }
    }

    #[test]
    fn test_no_attachments() {
        let note = NoteContext {
            title: Some("Plan".into()),
            folder: Some("Work".into()),
            content: Some("Ship it".into()),
            attachments: vec![],
        };
        let ctx = build_context(&note);
        assert_eq!(ctx, "### Title: Plan\n\n### Folder: Work\n\n### Content:\nShip it\n\n");
        assert!(!ctx.contains("#### Attachment"));
    }

    #[test]
    fn test_defaults_for_blank_fields() {
        let note = NoteContext {
            title: Some(String::new()),
            ..Default::default()
        };
        let ctx = build_context(&note);
        assert!(ctx.starts_with("### Title: Untitled\n\n### Folder: General\n\n### Content:\n(Empty)\n\n"));
    }

    #[test]
    fn test_attachments_in_order() {
        let note = NoteContext {
            title: Some("T".into()),
            attachments: vec![att("a.pdf", "Hello"), att("b.xyz", "")],
            ..Default::default()
        };
        let ctx = build_context(&note);
        assert!(ctx.contains(
            "### Attachments:\n\n#### Attachment 1: a.pdf\n(Extracted Content):\nHello\n---\n\
             \n#### Attachment 2: b.xyz\n(No text extracted or unsupported format)\n---\n"
        ));
        assert!(ctx.ends_with("---\n"));
    }

    #[test]
    fn test_missing_text_same_as_empty() {
        let note = NoteContext {
            attachments: vec![AttachmentContext {
                name: "scan.png".into(),
                extracted_text: None,
            }],
            ..Default::default()
        };
        assert!(build_context(&note)
            .contains("#### Attachment 1: scan.png\n(No text extracted or unsupported format)\n---\n"));
    }

    #[test]
    fn test_per_attachment_cap() {
        let note = NoteContext {
            attachments: vec![att("long.txt", "abcdefghij"), att("short.txt", "xyz")],
            ..Default::default()
        };
        let budget = ContextBudget {
            per_attachment: 4,
            total: 100,
        };
        let ctx = build_context_with(&note, budget);
        assert!(ctx.contains("(Extracted Content):\nabcd\n[truncated]\n---\n"));
        assert!(ctx.contains("(Extracted Content):\nxyz\n---\n"));
    }

    #[test]
    fn test_total_budget_spent_across_attachments() {
        let note = NoteContext {
            attachments: vec![att("1.txt", "aaaaa"), att("2.txt", "bbbbb"), att("3.txt", "ccc")],
            ..Default::default()
        };
        let budget = ContextBudget {
            per_attachment: 100,
            total: 8,
        };
        let ctx = build_context_with(&note, budget);
        assert!(ctx.contains("#### Attachment 1: 1.txt\n(Extracted Content):\naaaaa\n---\n"));
        assert!(ctx.contains("#### Attachment 2: 2.txt\n(Extracted Content):\nbbb\n[truncated]\n---\n"));
        assert!(ctx.contains("#### Attachment 3: 3.txt\n(Extracted Content):\n\n[truncated]\n---\n"));
    }

    #[test]
    fn test_cut_on_char_boundary() {
        let (head, cut) = take_chars("héllo wörld", 7);
        assert_eq!(head, "héllo w");
        assert!(cut);
        assert_eq!(take_chars("ab", 2), ("ab", false));
    }

    #[test]
    fn test_budget_from_limits() {
        let limits = Limits {
            max_attachment_chars: 10,
            max_context_chars: 20,
            ..Default::default()
        };
        assert_eq!(
            ContextBudget::from(&limits),
            ContextBudget {
                per_attachment: 10,
                total: 20
            }
        );
    }
}
