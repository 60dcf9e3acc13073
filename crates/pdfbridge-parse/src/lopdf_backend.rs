//! lopdf-based document engine.
//!
//! Implements [`PdfBackend`] using the [lopdf](https://crates.io/crates/lopdf)
//! crate. The object helpers at the bottom of this file are shared by the
//! outline cursor, font extraction and content filtering.

use std::io::Write;

use lopdf::{Dictionary, Object, ObjectId};
use pdfbridge_core::{FilterOptions, Link, OpenOptions, PageFont, PdfError, Rect, StextPage};
use tracing::{debug, warn};

use crate::backend::PdfBackend;
use crate::content_filter::{self, FilterSummary};
use crate::error::BackendError;
use crate::fonts;
use crate::text_extract;

/// US Letter, used when a page has no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// A parsed document backed by lopdf.
pub struct LopdfDocument {
    /// The underlying lopdf document.
    inner: lopdf::Document,
    /// Cached ordered list of page ObjectIds (indexed by 0-based page number).
    page_ids: Vec<ObjectId>,
    /// `/Filter` of the encryption dictionary, read at load time.
    encryption: Option<String>,
    /// Encrypted and not yet authenticated.
    locked: bool,
    /// The file as read, kept while locked; lopdf loads no objects of a
    /// document it cannot decrypt, so authentication reloads from here.
    source: Option<Vec<u8>>,
}

impl LopdfDocument {
    fn new(inner: lopdf::Document, bytes: &[u8]) -> Self {
        let encryption = encryption_filter(&inner);
        let locked = inner.is_encrypted();
        let page_ids = inner.get_pages().values().copied().collect();
        Self {
            inner,
            page_ids,
            encryption,
            locked,
            source: locked.then(|| bytes.to_vec()),
        }
    }

    /// Access the underlying lopdf document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    pub(crate) fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    fn refresh_pages(&mut self) {
        self.page_ids = self.inner.get_pages().values().copied().collect();
    }
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

/// A reference to a single page within a [`LopdfDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LopdfPage {
    /// The lopdf object ID for this page.
    pub object_id: ObjectId,
    /// The 0-based page index.
    pub index: usize,
}

/// The lopdf-based document engine.
///
/// # Example
///
/// ```ignore
/// use pdfbridge_parse::{LopdfBackend, PdfBackend};
///
/// let doc = LopdfBackend::open(pdf_bytes, &OpenOptions::default())?;
/// let count = LopdfBackend::page_count(&doc);
/// let page = LopdfBackend::get_page(&doc, 0)?;
/// ```
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = LopdfPage;
    type Error = BackendError;

    fn open(bytes: &[u8], options: &OpenOptions) -> Result<Self::Document, Self::Error> {
        if let Some(limit) = options.max_input_bytes {
            if bytes.len() > limit {
                return Err(BackendError::Limit {
                    name: "max_input_bytes",
                    limit,
                    actual: bytes.len(),
                });
            }
        }

        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;
        let mut doc = LopdfDocument::new(inner, bytes);
        debug!(
            pages = doc.page_ids.len(),
            encrypted = doc.locked,
            "opened document"
        );

        if let Some(password) = &options.password {
            if !Self::authenticate_password(&mut doc, password) {
                return Err(BackendError::Core(PdfError::generic("invalid password")));
            }
        }
        Ok(doc)
    }

    fn page_count(doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn needs_password(doc: &Self::Document) -> bool {
        doc.locked
    }

    fn authenticate_password(doc: &mut Self::Document, password: &str) -> bool {
        if !doc.locked {
            return true;
        }
        let Some(source) = doc.source.as_deref() else {
            return false;
        };
        match lopdf::Document::load_mem_with_password(source, password) {
            Ok(inner) => {
                doc.inner = inner;
                doc.locked = false;
                doc.source = None;
                doc.refresh_pages();
                debug!(pages = doc.page_ids.len(), "document decrypted");
                true
            }
            Err(e) => {
                debug!(error = %e, "password rejected");
                false
            }
        }
    }

    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
        if doc.locked {
            return Err(BackendError::Core(PdfError::generic(
                "document requires a password",
            )));
        }
        match doc.page_ids.get(index) {
            Some(&object_id) => Ok(LopdfPage { object_id, index }),
            None => Err(BackendError::Core(PdfError::argument(format!(
                "invalid page number: {}",
                index.saturating_add(1)
            )))),
        }
    }

    fn page_bound(doc: &Self::Document, page: &Self::Page) -> Result<Rect, Self::Error> {
        match resolve_inherited(&doc.inner, page.object_id, b"MediaBox")? {
            Some(obj) => {
                let obj = resolve(&doc.inner, obj);
                let array = obj
                    .as_array()
                    .map_err(|e| BackendError::Parse(format!("MediaBox is not an array: {e}")))?;
                rect_from_array(array)
            }
            None => {
                warn!(page = page.index, "page has no MediaBox, using US Letter");
                Ok(DEFAULT_MEDIA_BOX)
            }
        }
    }

    fn lookup_metadata(doc: &Self::Document, key: &str) -> Option<String> {
        match key {
            "format" => Some(format!("PDF {}", doc.inner.version)),
            "encryption" => Some(doc.encryption.clone().unwrap_or_else(|| "None".to_string())),
            _ => {
                let info_key = key.strip_prefix("info:")?;
                let info = info_dict(&doc.inner)?;
                text_string_entry(&doc.inner, info, info_key.as_bytes())
            }
        }
    }

    fn page_links(doc: &Self::Document, page: &Self::Page) -> Result<Vec<Link>, Self::Error> {
        extract_page_links(doc, page.object_id)
    }

    fn page_fonts(doc: &Self::Document, page: &Self::Page) -> Result<Vec<PageFont>, Self::Error> {
        fonts::extract_page_fonts(&doc.inner, page.object_id)
    }

    fn page_text(doc: &Self::Document, page: &Self::Page) -> Result<StextPage, Self::Error> {
        if doc.locked {
            return Err(BackendError::Core(PdfError::generic(
                "document requires a password",
            )));
        }
        let bound = Self::page_bound(doc, page)?;
        text_extract::extract_page_text(&doc.inner, page.object_id, bound)
    }

    fn filter_page(
        doc: &mut Self::Document,
        page: &Self::Page,
        options: &mut FilterOptions,
    ) -> Result<FilterSummary, Self::Error> {
        if doc.locked {
            return Err(BackendError::Core(PdfError::generic(
                "document requires a password",
            )));
        }
        content_filter::filter_page(&mut doc.inner, page.object_id, page.index, options)
    }

    fn save_to<W: Write>(doc: &mut Self::Document, writer: &mut W) -> Result<(), Self::Error> {
        doc.inner.save_to(writer)?;
        Ok(())
    }
}

/// `/Filter` name of the trailer's `/Encrypt` dictionary.
///
/// lopdf decrypts documents with an empty user password while loading and
/// drops `/Encrypt`; those report the standard handler.
fn encryption_filter(doc: &lopdf::Document) -> Option<String> {
    let Ok(encrypt) = doc.trailer.get(b"Encrypt") else {
        return doc.was_encrypted().then(|| "Standard".to_string());
    };
    let dict = resolve(doc, encrypt).as_dict().ok()?;
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => Some("Standard".to_string()),
    }
}

fn info_dict(doc: &lopdf::Document) -> Option<&Dictionary> {
    resolve(doc, doc.trailer.get(b"Info").ok()?).as_dict().ok()
}

/// Extract the Link annotations of a page.
///
/// Annotations without a `/Rect` or without a resolvable target are skipped.
fn extract_page_links(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<Link>, BackendError> {
    let inner = &doc.inner;
    let page_dict = inner
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

    let annots = match page_dict.get(b"Annots") {
        Ok(obj) => resolve(inner, obj),
        Err(_) => return Ok(Vec::new()),
    };
    let annots = annots
        .as_array()
        .map_err(|e| BackendError::Parse(format!("/Annots is not an array: {e}")))?;

    let mut links = Vec::new();
    for entry in annots {
        let Ok(annot) = resolve(inner, entry).as_dict() else {
            warn!("skipping annotation that is not a dictionary");
            continue;
        };
        if !matches!(annot.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Link") {
            continue;
        }
        let rect = match annot
            .get(b"Rect")
            .map(|obj| resolve(inner, obj))
            .and_then(|obj| obj.as_array())
        {
            Ok(arr) => match rect_from_array(arr) {
                Ok(rect) => rect,
                Err(e) => {
                    warn!(error = %e, "skipping link with malformed /Rect");
                    continue;
                }
            },
            Err(_) => continue,
        };
        if let Some(uri) = resolve_target(inner, &doc.page_ids, annot) {
            if !uri.is_empty() {
                links.push(Link::new(rect, uri));
            }
        }
    }
    Ok(links)
}

/// Resolve the target of an outline item or Link annotation.
///
/// Checks the `/A` action first (`URI`, `GoTo`, `GoToR`), then `/Dest`.
/// Explicit destinations become `#page=N` (1-based); named destinations are
/// returned by name.
pub(crate) fn resolve_target(
    doc: &lopdf::Document,
    page_ids: &[ObjectId],
    dict: &Dictionary,
) -> Option<String> {
    if let Ok(action) = dict.get(b"A") {
        if let Ok(action) = resolve(doc, action).as_dict() {
            match action.get(b"S") {
                Ok(Object::Name(kind)) if kind == b"URI" => {
                    return text_string_entry(doc, action, b"URI");
                }
                Ok(Object::Name(kind)) if kind == b"GoTo" => {
                    return resolve_dest(doc, page_ids, action.get(b"D").ok()?);
                }
                Ok(Object::Name(kind)) if kind == b"GoToR" => {
                    return file_spec(doc, action.get(b"F").ok()?);
                }
                _ => {}
            }
        }
    }
    resolve_dest(doc, page_ids, dict.get(b"Dest").ok()?)
}

fn resolve_dest(doc: &lopdf::Document, page_ids: &[ObjectId], dest: &Object) -> Option<String> {
    match resolve(doc, dest) {
        Object::Array(arr) => match arr.first()? {
            Object::Reference(page_ref) => page_ids
                .iter()
                .position(|id| id == page_ref)
                .map(|i| format!("#page={}", i + 1)),
            // Remote destinations carry a page index instead of a reference.
            Object::Integer(n) => n
                .checked_add(1)
                .filter(|page| *page > 0)
                .map(|page| format!("#page={page}")),
            _ => None,
        },
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Dictionary(d) => resolve_dest(doc, page_ids, d.get(b"D").ok()?),
        _ => None,
    }
}

fn file_spec(doc: &lopdf::Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Dictionary(d) => {
            text_string_entry(doc, d, b"UF").or_else(|| text_string_entry(doc, d, b"F"))
        }
        _ => None,
    }
}

/// Follow an indirect reference; other objects are returned as is.
///
/// A dangling reference resolves to `Object::Null`.
pub(crate) fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(&Object::Null),
        other => other,
    }
}

/// Look up a key in the page dictionary, walking up the page tree
/// (via /Parent) if the key is not found on the page itself.
///
/// Returns `None` if the key is not found anywhere in the tree.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, BackendError> {
    let mut current_id = page_id;
    // Bounded so a /Parent cycle cannot loop forever.
    for _ in 0..64 {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
    Err(BackendError::Parse("page tree is too deep".to_string()))
}

/// Convert a lopdf numeric object (Integer or Real) to f64.
pub(crate) fn object_to_f64(obj: &Object) -> Result<f64, BackendError> {
    match obj {
        Object::Integer(i) => Ok(*i as f64),
        Object::Real(f) => Ok(f64::from(*f)),
        _ => Err(BackendError::Parse(format!("expected number, got {obj:?}"))),
    }
}

/// Extract a [`Rect`] from a lopdf array of 4 numbers `[x0, y0, x1, y1]`.
pub(crate) fn rect_from_array(array: &[Object]) -> Result<Rect, BackendError> {
    if array.len() != 4 {
        return Err(BackendError::Parse(format!(
            "expected 4-element array for box, got {}",
            array.len()
        )));
    }
    Ok(Rect::new(
        object_to_f64(&array[0])?,
        object_to_f64(&array[1])?,
        object_to_f64(&array[2])?,
        object_to_f64(&array[3])?,
    ))
}

/// Decode a PDF text string: UTF-16BE with BOM, else UTF-8, else Latin-1.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// A string or name entry of a dictionary, decoded.
pub(crate) fn text_string_entry(
    doc: &lopdf::Document,
    dict: &Dictionary,
    key: &[u8],
) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{Document, Object, ObjectId, Stream, dictionary};

    /// Build a document whose pages have the given content streams.
    ///
    /// Every page is US Letter size and shares one resource dictionary
    /// holding a Type1 Helvetica font as `/F1`.
    pub fn document_with_contents(contents: &[&[u8]]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id: ObjectId = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for content in contents {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids.clone(),
                "Count" => kids.len() as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    /// A document with `page_count` empty pages.
    pub fn document_with_pages(page_count: usize) -> Document {
        let empty: Vec<&[u8]> = vec![&b""[..]; page_count];
        document_with_contents(&empty)
    }

    pub fn to_bytes(mut doc: Document) -> Vec<u8> {
        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    pub fn page_id(doc: &Document, index: usize) -> ObjectId {
        doc.get_pages()[&(index as u32 + 1)]
    }

    /// Save `doc` encrypted with RC4-128 under the given passwords.
    pub fn encrypted_bytes(mut doc: Document, user: &str, owner: &str) -> Vec<u8> {
        use lopdf::{EncryptionState, EncryptionVersion, Permissions, StringFormat};

        let id = Object::String(b"pdfbridge-fixture".to_vec(), StringFormat::Hexadecimal);
        doc.trailer.set("ID", vec![id.clone(), id]);
        let version = EncryptionVersion::V2 {
            document: &doc,
            owner_password: owner,
            user_password: user,
            key_length: 128,
            permissions: Permissions::all(),
        };
        let state = EncryptionState::try_from(version).expect("encryption state");
        doc.encrypt(&state).expect("failed to encrypt test PDF");
        to_bytes(doc)
    }
}
