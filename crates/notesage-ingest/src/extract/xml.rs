//! Shared helpers for the zipped-XML Office formats (docx, pptx, xlsx).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::ParseError;

pub(crate) fn open_archive(path: &Path) -> Result<ZipArchive<File>, ParseError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(file)?)
}

/// Read one part of the package as a string; `None` when the part is absent.
pub(crate) fn read_part(
    archive: &mut ZipArchive<File>,
    name: &str,
) -> Result<Option<String>, ParseError> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Names of numbered parts such as `ppt/slides/slide12.xml`, in numeric order.
pub(crate) fn numbered_parts(archive: &ZipArchive<File>, prefix: &str) -> Vec<String> {
    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix(prefix)?.strip_suffix(".xml")?;
            Some((number.parse().ok()?, name.to_string()))
        })
        .collect();
    parts.sort_by_key(|(n, _)| *n);
    parts.into_iter().map(|(_, name)| name).collect()
}

/// Visible text of a WordprocessingML or DrawingML body.
///
/// Text runs (`<*:t>`) are concatenated, each paragraph ends with a newline,
/// in-run tabs and line breaks are kept.
pub(crate) fn paragraph_text(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::with_capacity(xml.len() / 4);
    let mut in_text = false;
    let mut in_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"r" => in_run = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"r" => in_run = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
