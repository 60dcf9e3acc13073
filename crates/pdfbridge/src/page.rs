//! Page handles derived from a [`Document`].

use std::rc::{Rc, Weak};

use pdfbridge_core::{Link, PdfError, Rect, SearchHit, StextPage, search_stext};
use pdfbridge_parse::{LopdfBackend, LopdfPage, PdfBackend};

use crate::Document;
use crate::document::DocumentInner;

/// A page of a [`Document`].
///
/// The page refers back to its document without keeping it alive; once every
/// document handle is dropped, each method fails with
/// `code=1: page used after its document was dropped`.
#[derive(Clone)]
pub struct Page {
    doc: Weak<DocumentInner>,
    page: LopdfPage,
}

impl Page {
    pub(crate) fn new(doc: Weak<DocumentInner>, page: LopdfPage) -> Self {
        Self { doc, page }
    }

    /// Returns the page index (0-based).
    pub fn index(&self) -> usize {
        self.page.index
    }

    /// Returns `true` while a handle to the owning document exists.
    pub fn is_alive(&self) -> bool {
        self.doc.strong_count() > 0
    }

    /// Page bounds from the (inherited) `/MediaBox`.
    ///
    /// # Errors
    ///
    /// Fails if the document was dropped or the box is malformed.
    pub fn bound(&self) -> Result<Rect, PdfError> {
        let inner = self.upgrade()?;
        let doc = inner.doc()?;
        LopdfBackend::page_bound(&doc, &self.page).map_err(PdfError::from)
    }

    /// Link annotations on the page, in annotation order.
    ///
    /// # Errors
    ///
    /// Fails if the document was dropped or `/Annots` is malformed.
    pub fn links(&self) -> Result<Vec<Link>, PdfError> {
        let inner = self.upgrade()?;
        let doc = inner.doc()?;
        LopdfBackend::page_links(&doc, &self.page).map_err(PdfError::from)
    }

    /// Characters shown on the page, grouped into blocks and lines.
    ///
    /// # Errors
    ///
    /// Fails if the document was dropped or is locked, or the content
    /// cannot be decoded.
    pub fn stext_page(&self) -> Result<StextPage, PdfError> {
        let inner = self.upgrade()?;
        let doc = inner.doc()?;
        LopdfBackend::page_text(&doc, &self.page).map_err(PdfError::from)
    }

    /// Quads of the case-insensitive matches of `needle`, at most
    /// `max_hits` of them. See [`search_stext`].
    ///
    /// # Errors
    ///
    /// Fails as [`Page::stext_page`] does.
    pub fn search(&self, needle: &str, max_hits: usize) -> Result<Vec<SearchHit>, PdfError> {
        Ok(search_stext(&self.stext_page()?, needle, max_hits))
    }

    /// A new handle to the owning document.
    ///
    /// # Errors
    ///
    /// Fails if the document was dropped.
    pub fn document(&self) -> Result<Document, PdfError> {
        self.upgrade().map(Document::from_inner)
    }

    /// The engine page, after checking it belongs to `owner`.
    pub(crate) fn owned_by(&self, owner: &Rc<DocumentInner>) -> Result<LopdfPage, PdfError> {
        let inner = self.upgrade()?;
        if !Rc::ptr_eq(&inner, owner) {
            return Err(PdfError::argument("page belongs to another document"));
        }
        Ok(self.page)
    }

    fn upgrade(&self) -> Result<Rc<DocumentInner>, PdfError> {
        self.doc
            .upgrade()
            .ok_or_else(|| PdfError::generic("page used after its document was dropped"))
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.page.index)
            .field("alive", &self.is_alive())
            .finish()
    }
}
