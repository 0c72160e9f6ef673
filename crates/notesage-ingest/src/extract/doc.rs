//! Legacy Word 97-2003 adapter: main document text read through the piece table.
//!
//! A `.doc` is a Compound File holding a `WordDocument` stream (starting with
//! the File Information Block) and a `0Table`/`1Table` stream whose Clx
//! structure maps character positions to byte offsets in `WordDocument`.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;

use cfb::CompoundFile;
use encoding_rs::WINDOWS_1252;

use crate::ParseError;

/// Signature shared by every Compound File Binary document.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

const FIB_FLAGS: usize = 0x000A;
const FIB_CCP_TEXT: usize = 0x004C;
const FIB_FC_CLX: usize = 0x01A2;
const FIB_LCB_CLX: usize = 0x01A6;
const F_WHICH_TBL_STREAM: u16 = 0x0200;
const FC_COMPRESSED: u32 = 0x4000_0000;
const FC_MASK: u32 = 0x3FFF_FFFF;

const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';

/// A run of characters stored contiguously in the `WordDocument` stream.
#[derive(Debug)]
struct Piece {
    offset: usize,
    chars: usize,
    compressed: bool,
}

/// Whether the file starts with the Compound File signature.
pub fn is_compound_file(path: &Path) -> Result<bool, ParseError> {
    let mut header = [0u8; 8];
    match File::open(path)?.read_exact(&mut header) {
        Ok(()) => Ok(header == CFB_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

pub fn extract(path: &Path) -> Result<String, ParseError> {
    let bytes = std::fs::read(path)?;
    extract_from_mem(&bytes)
}

pub fn extract_from_mem(bytes: &[u8]) -> Result<String, ParseError> {
    let mut cfb = CompoundFile::open(Cursor::new(bytes))?;
    let word = read_stream(&mut cfb, "/WordDocument")?;

    let table_name = if u16_at(&word, FIB_FLAGS)? & F_WHICH_TBL_STREAM != 0 {
        "/1Table"
    } else {
        "/0Table"
    };
    let table = read_stream(&mut cfb, table_name)?;

    let fc_clx = u32_at(&word, FIB_FC_CLX)? as usize;
    let lcb_clx = u32_at(&word, FIB_LCB_CLX)? as usize;
    let clx = table
        .get(fc_clx..fc_clx.saturating_add(lcb_clx))
        .ok_or_else(|| malformed("Clx lies outside the table stream"))?;

    let mut remaining = u32_at(&word, FIB_CCP_TEXT)? as usize;
    let mut raw = String::new();
    for piece in piece_table(clx)? {
        if remaining == 0 {
            break;
        }
        let chars = piece.chars.min(remaining);
        raw.push_str(&piece_text(&word, &piece, chars)?);
        remaining -= chars;
    }

    Ok(document_text(&raw))
}

fn read_stream<F: Read + Seek>(cfb: &mut CompoundFile<F>, name: &str) -> Result<Vec<u8>, ParseError> {
    let mut stream = cfb.open_stream(name).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ParseError::MissingPart(name.trim_start_matches('/').to_string()),
        _ => ParseError::Io(e),
    })?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}

/// Skip the Prc entries of a Clx and decode its PlcPcd.
fn piece_table(clx: &[u8]) -> Result<Vec<Piece>, ParseError> {
    let mut pos = 0;
    while clx.get(pos) == Some(&0x01) {
        pos += 3 + u16_at(clx, pos + 1)? as usize;
    }
    if clx.get(pos) != Some(&0x02) {
        return Err(malformed("piece table not found"));
    }

    let lcb = u32_at(clx, pos + 1)? as usize;
    let plc = clx
        .get(pos + 5..pos + 5 + lcb)
        .ok_or_else(|| malformed("piece table truncated"))?;
    if lcb < 4 || (lcb - 4) % 12 != 0 {
        return Err(malformed("piece table has an invalid size"));
    }

    let count = (lcb - 4) / 12;
    let descriptors = (count + 1) * 4;
    (0..count)
        .map(|i| {
            let start = u32_at(plc, i * 4)? as usize;
            let end = u32_at(plc, (i + 1) * 4)? as usize;
            let fc = u32_at(plc, descriptors + i * 8 + 2)?;
            let compressed = fc & FC_COMPRESSED != 0;
            let offset = (fc & FC_MASK) as usize;
            Ok(Piece {
                offset: if compressed { offset / 2 } else { offset },
                chars: end.checked_sub(start).ok_or_else(|| malformed("pieces out of order"))?,
                compressed,
            })
        })
        .collect()
}

fn piece_text(word: &[u8], piece: &Piece, chars: usize) -> Result<String, ParseError> {
    let width = if piece.compressed { 1 } else { 2 };
    let bytes = word
        .get(piece.offset..piece.offset + chars * width)
        .ok_or_else(|| malformed("piece lies outside the document stream"))?;

    if piece.compressed {
        let (text, _, _) = WINDOWS_1252.decode(bytes);
        Ok(text.into_owned())
    } else {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Map Word's control characters to plain text. Field instructions are
/// dropped and field results kept.
fn document_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    // one entry per open field, true while inside its instruction
    let mut fields: Vec<bool> = Vec::new();
    for ch in raw.chars() {
        match ch {
            FIELD_BEGIN => fields.push(true),
            FIELD_SEPARATOR => {
                if let Some(instruction) = fields.last_mut() {
                    *instruction = false;
                }
            }
            FIELD_END => {
                fields.pop();
            }
            _ if fields.iter().any(|&instruction| instruction) => {}
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' => out.push('\t'),
            '\t' | '\n' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn malformed(what: &str) -> ParseError {
    ParseError::Word(what.to_string())
}

fn u16_at(data: &[u8], at: usize) -> Result<u16, ParseError> {
    data.get(at..at + 2)
        .and_then(|b| <[u8; 2]>::try_from(b).ok())
        .map(u16::from_le_bytes)
        .ok_or_else(|| malformed("unexpected end of structure"))
}

fn u32_at(data: &[u8], at: usize) -> Result<u32, ParseError> {
    data.get(at..at + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| malformed("unexpected end of structure"))
}
