//! Page text extraction.
//!
//! Runs the text operators of a page's content, and of the Form XObjects it
//! draws, to place each shown character in page space. A glyph sits at the
//! origin of the text rendering matrix `[size*Th 0 0 size 0 rise] × Tm ×
//! CTM` and its quad spans the font's descent to ascent. The placed
//! characters are grouped into lines and blocks by [`StextBuilder`].

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId};
use pdfbridge_core::{Matrix, Point, Quad, Rect, StextBuilder, StextPage, TextChar};
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

use crate::content_filter::{decode_stream, matrix_from_operands, page_content_bytes};
use crate::error::BackendError;
use crate::fonts::{name_entry, strip_subset_prefix};
use crate::lopdf_backend::{object_to_f64, resolve, resolve_inherited};

/// Forms nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 12;

/// Largest code range a `/W` or `bfrange` entry may expand to.
const MAX_RANGE: u32 = 0xFFFF;

/// Helvetica advance widths for codes 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

pub(crate) fn extract_page_text(
    doc: &lopdf::Document,
    page_id: ObjectId,
    bound: Rect,
) -> Result<StextPage, BackendError> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|e| BackendError::Parse(format!("page object is not a dictionary: {e}")))?;
    let content = page_content_bytes(doc, page)?;
    let resources =
        resolve_inherited(doc, page_id, b"Resources")?.and_then(|r| resolve(doc, r).as_dict().ok());

    let mut run = TextRun {
        doc,
        fonts: HashMap::new(),
        active_forms: HashSet::new(),
        builder: StextBuilder::new(bound),
    };
    run.interpret(&content, resources, Matrix::identity(), 0)?;
    let page = run.builder.finish();
    debug!(blocks = page.blocks.len(), "extracted page text");
    Ok(page)
}

/// Text state carried by `q`/`Q` along with the CTM.
#[derive(Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Rc<TextFont>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz` as a fraction.
    scale: f64,
    leading: f64,
    rise: f64,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct TextRun<'a> {
    doc: &'a lopdf::Document,
    fonts: HashMap<ObjectId, Rc<TextFont>>,
    /// Forms being run, so a form drawing itself is not re-entered.
    active_forms: HashSet<ObjectId>,
    builder: StextBuilder,
}

impl<'a> TextRun<'a> {
    fn interpret(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), BackendError> {
        let content = Content::decode(content)
            .map_err(|e| BackendError::Parse(format!("failed to decode content stream: {e}")))?;

        let mut gs = GraphicsState::new(ctm);
        let mut saved = Vec::new();
        let mut tm = Matrix::identity();
        let mut tlm = Matrix::identity();
        let mut in_text = false;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => saved.push(gs.clone()),
                "Q" => {
                    if let Some(state) = saved.pop() {
                        gs = state;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from_operands(operands) {
                        gs.ctm = m.concat(&gs.ctm);
                    }
                }
                "BT" => {
                    in_text = true;
                    tm = Matrix::identity();
                    tlm = Matrix::identity();
                }
                "ET" => in_text = false,
                "Tj" | "'" | "\"" | "TJ" if !in_text => {
                    debug!(operator = %op.operator, "text shown outside BT/ET ignored");
                }
                "Tf" => {
                    if let [Object::Name(name), size] = operands {
                        gs.font = Some(self.font(resources, name));
                        gs.size = object_to_f64(size).unwrap_or(gs.size);
                    }
                }
                "Tc" => set_number(&mut gs.char_spacing, operands),
                "Tw" => set_number(&mut gs.word_spacing, operands),
                "TL" => set_number(&mut gs.leading, operands),
                "Ts" => set_number(&mut gs.rise, operands),
                "Tz" => {
                    if let Some(percent) = number(operands, 0) {
                        gs.scale = percent / 100.0;
                    }
                }
                "Td" | "TD" => {
                    if let (Some(tx), Some(ty)) = (number(operands, 0), number(operands, 1)) {
                        if op.operator == "TD" {
                            gs.leading = -ty;
                        }
                        tlm = Matrix::translate(tx, ty).concat(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_from_operands(operands) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => next_line(&mut tm, &mut tlm, gs.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "'" => {
                    next_line(&mut tm, &mut tlm, gs.leading);
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "\"" => {
                    if let [aw, ac, Object::String(bytes, _)] = operands {
                        gs.word_spacing = object_to_f64(aw).unwrap_or(gs.word_spacing);
                        gs.char_spacing = object_to_f64(ac).unwrap_or(gs.char_spacing);
                        next_line(&mut tm, &mut tlm, gs.leading);
                        self.show(&gs, &mut tm, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show(&gs, &mut tm, bytes),
                                other => {
                                    if let Ok(adjust) = object_to_f64(other) {
                                        let tx = -adjust / 1000.0 * gs.size * gs.scale;
                                        tm = Matrix::translate(tx, 0.0).concat(&tm);
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_form(resources, name, gs.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Place the glyphs of one string and advance the text matrix.
    fn show(&mut self, gs: &GraphicsState, tm: &mut Matrix, bytes: &[u8]) {
        let Some(font) = gs.font.as_deref() else {
            warn!("text shown before a font was selected");
            return;
        };
        for code in font.codes(bytes) {
            let w0 = font.width(code);
            let trm = Matrix::new(gs.size * gs.scale, 0.0, 0.0, gs.size, 0.0, gs.rise)
                .concat(tm)
                .concat(&gs.ctm);
            let corner = |x: f64, y: f64| trm.transform_point(Point::new(x, y));
            let quad = Quad {
                ul: corner(0.0, font.ascent),
                ur: corner(w0, font.ascent),
                ll: corner(0.0, font.descent),
                lr: corner(w0, font.descent),
            };
            let origin = corner(0.0, 0.0);
            let size = trm.c.hypot(trm.d);
            let length = trm.a.hypot(trm.b);
            let dir = if length > 0.0 {
                Point::new(trm.a / length, trm.b / length)
            } else {
                Point::new(1.0, 0.0)
            };

            for c in expand_ligatures(&font.decode(code)).chars() {
                let ch = TextChar {
                    c,
                    origin,
                    quad,
                    size,
                    font: font.name.clone(),
                };
                self.builder.push(ch, dir);
            }

            let mut advance = w0 * gs.size + gs.char_spacing;
            if code == 32 && !font.two_byte {
                advance += gs.word_spacing;
            }
            *tm = Matrix::translate(advance * gs.scale, 0.0).concat(tm);
        }
    }

    fn font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Rc<TextFont> {
        let doc = self.doc;
        let resource = String::from_utf8_lossy(name);
        let entry = resources
            .and_then(|r| r.get(b"Font").ok())
            .and_then(|f| resolve(doc, f).as_dict().ok())
            .and_then(|f| f.get(name).ok());
        match entry {
            Some(Object::Reference(id)) => {
                if let Some(font) = self.fonts.get(id) {
                    return Rc::clone(font);
                }
                let font = Rc::new(match doc.get_dictionary(*id) {
                    Ok(dict) => TextFont::load(doc, dict, &resource),
                    Err(_) => TextFont::standard(&resource),
                });
                self.fonts.insert(*id, Rc::clone(&font));
                font
            }
            Some(Object::Dictionary(dict)) => Rc::new(TextFont::load(doc, dict, &resource)),
            _ => {
                warn!(font = %resource, "text uses a font missing from /Resources");
                Rc::new(TextFont::standard(&resource))
            }
        }
    }

    fn draw_form(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        ctm: Matrix,
        depth: usize,
    ) -> Result<(), BackendError> {
        let doc = self.doc;
        let Some(Object::Reference(id)) = resources
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| resolve(doc, x).as_dict().ok())
            .and_then(|x| x.get(name).ok())
        else {
            return Ok(());
        };
        let id = *id;
        let Ok(stream) = doc.get_object(id).and_then(|o| o.as_stream()) else {
            return Ok(());
        };
        let is_form = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(s)) if s == b"Form");
        if !is_form || self.active_forms.contains(&id) {
            return Ok(());
        }
        if depth >= MAX_FORM_DEPTH {
            warn!(depth, "forms nested too deeply, skipping text");
            return Ok(());
        }

        let matrix = stream
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|m| resolve(doc, m).as_array().ok())
            .and_then(|m| matrix_from_operands(m))
            .unwrap_or_default();
        let form_resources = stream
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve(doc, r).as_dict().ok())
            .or(resources);
        let content = decode_stream(stream)?;

        self.active_forms.insert(id);
        let result = self.interpret(&content, form_resources, matrix.concat(&ctm), depth + 1);
        self.active_forms.remove(&id);
        result
    }
}

/// Latin ligatures (U+FB00..=U+FB06) become their letters.
fn expand_ligatures(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if ('\u{FB00}'..='\u{FB06}').contains(&c) {
            out.extend(std::iter::once(c).nfkc());
        } else {
            out.push(c);
        }
    }
    out
}

fn number(operands: &[Object], index: usize) -> Option<f64> {
    operands.get(index).and_then(|o| object_to_f64(o).ok())
}

fn set_number(slot: &mut f64, operands: &[Object]) {
    if let Some(value) = number(operands, 0) {
        *slot = value;
    }
}

fn next_line(tm: &mut Matrix, tlm: &mut Matrix, leading: f64) {
    *tlm = Matrix::translate(0.0, -leading).concat(tlm);
    *tm = *tlm;
}

/// Metrics and code mapping of a font, in text space units (1/1000 scaled).
#[derive(Debug)]
struct TextFont {
    name: String,
    /// Type0 fonts show two-byte codes.
    two_byte: bool,
    widths: HashMap<u32, f64>,
    default_width: f64,
    ascent: f64,
    descent: f64,
    to_unicode: HashMap<u32, String>,
}

impl TextFont {
    /// A font known only by name: standard widths where known.
    fn standard(base: &str) -> Self {
        let widths = if base.starts_with("Courier") {
            (32..=126).map(|code| (code, 0.6)).collect()
        } else if base.starts_with("Helvetica") || base.starts_with("Arial") {
            (32u32..)
                .zip(HELVETICA_ASCII)
                .map(|(code, w)| (code, f64::from(w) / 1000.0))
                .collect()
        } else {
            HashMap::new()
        };
        Self {
            name: base.to_string(),
            two_byte: false,
            widths,
            default_width: 0.5,
            ascent: 0.75,
            descent: -0.25,
            to_unicode: HashMap::new(),
        }
    }

    fn load(doc: &lopdf::Document, font: &Dictionary, resource: &str) -> Self {
        let subtype = name_entry(font, b"Subtype").unwrap_or_default();
        let base = name_entry(font, b"BaseFont")
            .map(|n| strip_subset_prefix(&n).to_string())
            .unwrap_or_else(|| resource.to_string());
        let mut out = Self::standard(&base);

        let descendant = font
            .get(b"DescendantFonts")
            .ok()
            .and_then(|d| resolve(doc, d).as_array().ok())
            .and_then(|d| d.first())
            .and_then(|d| resolve(doc, d).as_dict().ok());

        if subtype == "Type0" {
            out.two_byte = true;
            out.widths.clear();
            out.default_width = 1.0;
            if let Some(cid_font) = descendant {
                if let Some(dw) = dict_number(doc, cid_font, b"DW") {
                    out.default_width = dw / 1000.0;
                }
                if let Some(w) = cid_font
                    .get(b"W")
                    .ok()
                    .and_then(|w| resolve(doc, w).as_array().ok())
                {
                    out.widths = cid_widths(doc, w);
                }
            }
        } else if let (Some(first), Some(widths)) = (
            dict_number(doc, font, b"FirstChar"),
            font.get(b"Widths")
                .ok()
                .and_then(|w| resolve(doc, w).as_array().ok()),
        ) {
            let first = first.max(0.0) as u32;
            out.widths = (first..)
                .zip(widths)
                .filter_map(|(code, w)| Some((code, object_to_f64(resolve(doc, w)).ok()? / 1000.0)))
                .collect();
        }

        let descriptor = descendant
            .unwrap_or(font)
            .get(b"FontDescriptor")
            .ok()
            .and_then(|d| resolve(doc, d).as_dict().ok());
        if let Some(descriptor) = descriptor {
            if let Some(missing) = dict_number(doc, descriptor, b"MissingWidth") {
                if subtype != "Type0" {
                    out.default_width = missing / 1000.0;
                }
            }
            match (
                dict_number(doc, descriptor, b"Ascent"),
                dict_number(doc, descriptor, b"Descent"),
            ) {
                (Some(ascent), Some(descent)) if ascent > descent => {
                    out.ascent = ascent / 1000.0;
                    out.descent = descent / 1000.0;
                }
                _ => {}
            }
        }

        if let Some(stream) = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|t| resolve(doc, t).as_stream().ok())
        {
            match decode_stream(stream) {
                Ok(data) => out.to_unicode = parse_to_unicode(&data),
                Err(e) => warn!(font = %out.name, error = %e, "unreadable /ToUnicode"),
            }
        }
        out
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| pair.iter().fold(0, |code, &b| code << 8 | u32::from(b)))
                .collect()
        } else {
            bytes.iter().map(|&b| u32::from(b)).collect()
        }
    }

    fn width(&self, code: u32) -> f64 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    /// Unicode text of a code: `/ToUnicode`, else Latin-1 for printable
    /// single-byte codes, else U+FFFD.
    fn decode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        match code {
            0x20..=0x7E | 0xA0..=0xFF if !self.two_byte => char::from(code as u8).to_string(),
            _ => char::REPLACEMENT_CHARACTER.to_string(),
        }
    }
}

fn dict_number(doc: &lopdf::Document, dict: &Dictionary, key: &[u8]) -> Option<f64> {
    dict.get(key)
        .ok()
        .and_then(|o| object_to_f64(resolve(doc, o)).ok())
}

/// Widths of a CID font `/W` array: `c [w1 w2 ...]` and `c_first c_last w`.
fn cid_widths(doc: &lopdf::Document, w: &[Object]) -> HashMap<u32, f64> {
    let mut out = HashMap::new();
    let mut i = 0;
    while i < w.len() {
        let Ok(first) = object_to_f64(resolve(doc, &w[i])) else {
            break;
        };
        let first = first.max(0.0) as u32;
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (cid, width) in (first..).zip(list) {
                    if let Ok(width) = object_to_f64(resolve(doc, width)) {
                        out.insert(cid, width / 1000.0);
                    }
                }
                i += 2;
            }
            Some(last) => {
                let (Ok(last), Some(Ok(width))) = (
                    object_to_f64(last),
                    w.get(i + 2).map(|o| object_to_f64(resolve(doc, o))),
                ) else {
                    break;
                };
                let last = (last.max(0.0) as u32).min(first.saturating_add(MAX_RANGE));
                for cid in first..=last {
                    out.insert(cid, width / 1000.0);
                }
                i += 3;
            }
            None => break,
        }
    }
    out
}

#[derive(Debug, PartialEq)]
enum CmapToken {
    Hex(Vec<u8>),
    Word(String),
    Open,
    Close,
}

fn cmap_tokens(data: &[u8]) -> Vec<CmapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push(CmapToken::Open);
                i += 1;
            }
            b']' => {
                tokens.push(CmapToken::Close);
                i += 1;
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(CmapToken::Word("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(CmapToken::Word(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let end = data[i..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(data.len(), |p| i + p);
                tokens.push(CmapToken::Hex(hex_bytes(&data[i + 1..end])));
                i = end + 1;
            }
            b'(' => {
                let end = data[i..]
                    .iter()
                    .position(|&b| b == b')')
                    .map_or(data.len(), |p| i + p);
                tokens.push(CmapToken::Word(String::from_utf8_lossy(&data[i..end]).into_owned()));
                i = end + 1;
            }
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !is_cmap_delimiter(data[i]) {
                    i += 1;
                }
                tokens.push(CmapToken::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    tokens
}

fn is_cmap_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b'<' | b'>' | b'(' | b'/' | b'%')
}

/// Hex digits to bytes; whitespace is skipped and an odd final digit is
/// padded with 0.
fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|&b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0, |code, &b| code << 8 | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
        .collect()
}

/// Code to text mappings of a `/ToUnicode` CMap (`bfchar` and `bfrange`).
fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = cmap_tokens(data);
    let mut map = HashMap::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            CmapToken::Word(w) if w == "beginbfchar" => {
                i += 1;
                while let (Some(CmapToken::Hex(src)), Some(CmapToken::Hex(dst))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    map.insert(code_of(src), String::from_utf16_lossy(&utf16_units(dst)));
                    i += 2;
                }
            }
            CmapToken::Word(w) if w == "beginbfrange" => {
                i += 1;
                while let (Some(CmapToken::Hex(lo)), Some(CmapToken::Hex(hi))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    let (lo, hi) = (code_of(lo), code_of(hi));
                    let hi = hi.min(lo.saturating_add(MAX_RANGE));
                    match tokens.get(i + 2) {
                        Some(CmapToken::Hex(dst)) => {
                            let units = utf16_units(dst);
                            for (offset, code) in (lo..=hi).enumerate() {
                                let mut units = units.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                            i += 3;
                        }
                        Some(CmapToken::Open) => {
                            i += 3;
                            let mut code = lo;
                            while let Some(CmapToken::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    map.insert(code, String::from_utf16_lossy(&utf16_units(dst)));
                                }
                                code = code.saturating_add(1);
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CmapToken::Close) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }
    map
}
