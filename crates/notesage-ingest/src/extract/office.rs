//! PowerPoint and Excel adapter. The package kind is sniffed from its parts,
//! so a mislabelled extension within the family still extracts.

use std::fs::File;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::docx;
use super::xml::{numbered_parts, open_archive, paragraph_text, read_part};
use crate::ParseError;

/// Extract text from a `.pptx` or `.xlsx` package.
pub fn extract(path: &Path) -> Result<String, ParseError> {
    let mut archive = open_archive(path)?;

    let has = |archive: &ZipArchive<File>, part: &str| archive.index_for_name(part).is_some();
    if has(&archive, "ppt/presentation.xml") {
        slides(&mut archive)
    } else if has(&archive, "xl/workbook.xml") {
        workbook(&mut archive)
    } else if has(&archive, "word/document.xml") {
        docx::extract_archive(&mut archive)
    } else {
        Err(ParseError::UnknownOffice)
    }
}

/// Slide text in slide order, one blank line between slides.
fn slides(archive: &mut ZipArchive<File>) -> Result<String, ParseError> {
    let mut out = Vec::new();
    for part in numbered_parts(archive, "ppt/slides/slide") {
        if let Some(xml) = read_part(archive, &part)? {
            out.push(paragraph_text(&xml)?);
        }
    }
    Ok(out.join("\n"))
}

/// Cell values of every worksheet: tab between cells, newline after each row.
fn workbook(archive: &mut ZipArchive<File>) -> Result<String, ParseError> {
    let shared = match read_part(archive, "xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut out = String::new();
    for part in numbered_parts(archive, "xl/worksheets/sheet") {
        if let Some(xml) = read_part(archive, &part)? {
            sheet_rows(&xml, &shared, &mut out)?;
        }
    }
    Ok(out)
}

fn shared_strings(xml: &str) -> Result<Vec<String>, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

#[derive(Clone, Copy, PartialEq)]
enum CellKind {
    Shared,
    Inline,
    Bool,
    Plain,
}

fn cell_kind(cell: &BytesStart) -> CellKind {
    let kind = cell
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"t")
        .map(|a| a.value.into_owned());
    match kind.as_deref() {
        Some(b"s") => CellKind::Shared,
        Some(b"inlineStr") => CellKind::Inline,
        Some(b"b") => CellKind::Bool,
        _ => CellKind::Plain,
    }
}

fn sheet_rows(xml: &str, shared: &[String], out: &mut String) -> Result<(), ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut row: Vec<String> = Vec::new();
    let mut kind = CellKind::Plain;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    kind = cell_kind(&e);
                    value.clear();
                }
                b"v" => in_value = true,
                b"t" if kind == CellKind::Inline => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => row.push(resolve_cell(kind, &value, shared)),
                b"row" => {
                    if row.iter().any(|c| !c.is_empty()) {
                        out.push_str(&row.join("\t"));
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Event::Text(t) if in_value => value.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(())
}

fn resolve_cell(kind: CellKind, raw: &str, shared: &[String]) -> String {
    match kind {
        CellKind::Shared => raw
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i))
            .cloned()
            .unwrap_or_default(),
        CellKind::Bool => match raw.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellKind::Inline | CellKind::Plain => raw.to_string(),
    }
}
