//! Font resources of a page.
//!
//! Reads each entry of the page's (inherited) `/Resources /Font` dictionary
//! into a [`PageFont`]: base name, subtype, whether a program is embedded,
//! the CID character collection, and style flags taken from the font
//! descriptor or, failing that, from the font name.

use lopdf::{Dictionary, Object, ObjectId};
use pdfbridge_core::{CjkOrdering, PageFont};
use tracing::warn;

use crate::error::BackendError;
use crate::lopdf_backend::{resolve, resolve_inherited};

/// `/Flags` bits of a font descriptor.
const FLAG_SERIF: i64 = 1 << 1;
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

pub(crate) fn extract_page_fonts(
    doc: &lopdf::Document,
    page_id: ObjectId,
) -> Result<Vec<PageFont>, BackendError> {
    let Some(resources) = resolve_inherited(doc, page_id, b"Resources")? else {
        return Ok(Vec::new());
    };
    let resources = resolve(doc, resources)
        .as_dict()
        .map_err(|_| BackendError::Parse("/Resources is not a dictionary".to_string()))?;
    let Ok(fonts) = resources.get(b"Font").map(|f| resolve(doc, f)) else {
        return Ok(Vec::new());
    };
    let fonts = fonts
        .as_dict()
        .map_err(|_| BackendError::Parse("/Font is not a dictionary".to_string()))?;

    let mut out = Vec::new();
    for (name, obj) in fonts.iter() {
        let resource = String::from_utf8_lossy(name).into_owned();
        match resolve(doc, obj).as_dict() {
            Ok(font) => out.push(page_font(doc, resource, font)),
            Err(_) => warn!(font = %resource, "skipping font resource that is not a dictionary"),
        }
    }
    Ok(out)
}

fn page_font(doc: &lopdf::Document, resource: String, font: &Dictionary) -> PageFont {
    let subtype = name_entry(font, b"Subtype").unwrap_or_else(|| "Type1".to_string());
    let base_font = name_entry(font, b"BaseFont")
        .map(|n| strip_subset_prefix(&n).to_string())
        .unwrap_or_else(|| resource.clone());

    // Type0 fonts keep their descriptor and CIDSystemInfo on the descendant.
    let descendant = if subtype == "Type0" {
        font.get(b"DescendantFonts")
            .map(|d| resolve(doc, d))
            .and_then(|d| d.as_array())
            .ok()
            .and_then(|arr| arr.first())
            .and_then(|d| resolve(doc, d).as_dict().ok())
    } else {
        None
    };
    let font_dict = descendant.unwrap_or(font);

    let descriptor = font_dict
        .get(b"FontDescriptor")
        .ok()
        .and_then(|d| resolve(doc, d).as_dict().ok());

    let embedded = subtype == "Type3"
        || descriptor.is_some_and(|d| {
            d.has(b"FontFile") || d.has(b"FontFile2") || d.has(b"FontFile3")
        });

    let cjk = descendant
        .and_then(|d| d.get(b"CIDSystemInfo").ok())
        .and_then(|info| resolve(doc, info).as_dict().ok())
        .and_then(|info| match info.get(b"Ordering").map(|o| resolve(doc, o)) {
            Ok(Object::String(bytes, _)) => {
                CjkOrdering::from_ordering(&String::from_utf8_lossy(bytes))
            }
            _ => None,
        });

    let flags = descriptor.and_then(|d| match d.get(b"Flags") {
        Ok(Object::Integer(f)) => Some(*f),
        _ => None,
    });
    let (name_bold, name_italic, name_serif) = style_from_name(&base_font);

    PageFont {
        resource,
        base_font,
        subtype,
        embedded,
        cjk,
        serif: flags.map_or(name_serif, |f| f & FLAG_SERIF != 0),
        bold: name_bold || flags.is_some_and(|f| f & FLAG_FORCE_BOLD != 0),
        italic: name_italic || flags.is_some_and(|f| f & FLAG_ITALIC != 0),
    }
}

pub(crate) fn name_entry(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// `ABCDEF+Times-Bold` -> `Times-Bold`.
pub(crate) fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((prefix, rest))
            if prefix.len() == 6 && prefix.bytes().all(|b| b.is_ascii_uppercase()) =>
        {
            rest
        }
        _ => name,
    }
}

/// Bold, italic and serif hints from a font name.
fn style_from_name(name: &str) -> (bool, bool, bool) {
    let lower = name.to_ascii_lowercase();
    let bold = ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|w| lower.contains(w));
    let italic = lower.contains("italic") || lower.contains("oblique");
    let serif = !lower.contains("sans")
        && ["times", "serif", "roman", "georgia", "garamond", "mincho", "song", "ming"]
            .iter()
            .any(|w| lower.contains(w));
    (bold, italic, serif)
}
