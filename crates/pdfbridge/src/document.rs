//! Shared document handles.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::io::Write;
use std::rc::Rc;

use pdfbridge_core::{
    FilterOptions, OpenOptions, Operation, OutlineWalker, PageFont, PdfError, SearchHit,
};
use pdfbridge_parse::{FilterSummary, LopdfBackend, LopdfDocument, LopdfOutlineCursor, PdfBackend};
use tracing::{debug, warn};

use crate::fonts::{FontResolution, resolve_fonts};
use crate::{Context, Page};

/// Name of the operation opened around a filtering call made outside any
/// explicit operation.
const IMPLICIT_FILTER_OPERATION: &str = "Filter";

/// Outline cursor borrowing a document.
pub type OutlineCursorRef<'a> = LopdfOutlineCursor<Ref<'a, LopdfDocument>>;

/// Depth-first walk over a document's outline.
pub type Outline<'a> = OutlineWalker<OutlineCursorRef<'a>>;

pub(crate) struct DocumentInner {
    doc: RefCell<LopdfDocument>,
    page_count: Cell<usize>,
    locked: Cell<bool>,
    operation: RefCell<Option<Operation>>,
}

impl DocumentInner {
    pub(crate) fn doc(&self) -> Result<Ref<'_, LopdfDocument>, PdfError> {
        self.doc.try_borrow().map_err(|_| busy())
    }

    fn doc_mut(&self) -> Result<RefMut<'_, LopdfDocument>, PdfError> {
        self.doc.try_borrow_mut().map_err(|_| busy())
    }
}

fn busy() -> PdfError {
    PdfError::generic("document is busy")
}

/// An open PDF document.
///
/// Cloning shares the underlying document; it stays alive while any clone
/// does. [`Page`] handles do not keep it alive.
///
/// # Example
///
/// ```ignore
/// let doc = Document::open(&bytes, None)?;
/// let page = doc.load_page(0)?;
/// let mut options = FilterOptions::default();
/// options.add_factory(per_stream::<AlternatingFilter>());
/// doc.filter_page_contents(&page, &mut options)?;
/// doc.save("out.pdf")?;
/// ```
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl Document {
    /// Open a PDF document from a file path.
    ///
    /// # Errors
    ///
    /// Returns a `System` engine error if the file cannot be read, or any
    /// error of [`Document::open`].
    #[cfg(feature = "std")]
    pub fn open_file(
        path: impl AsRef<std::path::Path>,
        options: Option<OpenOptions>,
    ) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::open(&bytes, options)
    }

    /// Open a PDF document from bytes.
    ///
    /// # Errors
    ///
    /// Returns a `Limit` engine error if the input is larger than
    /// `max_input_bytes`, a `Format` engine error if the bytes are not a PDF,
    /// and a `Generic` engine error if a given password is wrong.
    pub fn open(bytes: &[u8], options: Option<OpenOptions>) -> Result<Self, PdfError> {
        let options = options.unwrap_or_default();
        let doc = LopdfBackend::open(bytes, &options).map_err(PdfError::from)?;
        let page_count = LopdfBackend::page_count(&doc);
        let locked = LopdfBackend::needs_password(&doc);
        debug!(pages = page_count, locked, "document handle created");
        Ok(Self {
            inner: Rc::new(DocumentInner {
                doc: RefCell::new(doc),
                page_count: Cell::new(page_count),
                locked: Cell::new(locked),
                operation: RefCell::new(None),
            }),
        })
    }

    pub fn count_pages(&self) -> usize {
        self.inner.page_count.get()
    }

    pub fn needs_password(&self) -> bool {
        self.inner.locked.get()
    }

    /// Try a password on an encrypted document.
    ///
    /// Returns `true` once the document is readable; unencrypted documents
    /// always return `true`.
    ///
    /// # Errors
    ///
    /// Fails only if the document is in use by a running filter.
    pub fn authenticate_password(&self, password: &str) -> Result<bool, PdfError> {
        let mut doc = self.inner.doc_mut()?;
        let ok = LopdfBackend::authenticate_password(&mut doc, password);
        self.inner.locked.set(LopdfBackend::needs_password(&doc));
        self.inner.page_count.set(LopdfBackend::page_count(&doc));
        debug!(ok, "password attempt");
        Ok(ok)
    }

    /// Load a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns `code=4: invalid page number: <index+1>` when out of range and
    /// `code=1: document requires a password` while locked.
    pub fn load_page(&self, index: usize) -> Result<Page, PdfError> {
        let doc = self.inner.doc()?;
        let page = LopdfBackend::get_page(&doc, index).map_err(PdfError::from)?;
        Ok(Page::new(Rc::downgrade(&self.inner), page))
    }

    /// Search the page at `index` for `needle`, returning at most
    /// `max_hits` quads.
    ///
    /// # Errors
    ///
    /// Fails as [`Document::load_page`] and [`Page::stext_page`] do.
    pub fn search_page(
        &self,
        index: usize,
        needle: &str,
        max_hits: usize,
    ) -> Result<Vec<SearchHit>, PdfError> {
        let hits = self.load_page(index)?.search(needle, max_hits)?;
        debug!(page = index, hits = hits.len(), "searched page");
        Ok(hits)
    }

    /// Look up a metadata key: `format`, `encryption` or `info:<Key>`.
    ///
    /// # Errors
    ///
    /// Fails only if the document is in use by a running filter.
    pub fn lookup_metadata(&self, key: &str) -> Result<Option<String>, PdfError> {
        let doc = self.inner.doc()?;
        Ok(LopdfBackend::lookup_metadata(&doc, key))
    }

    /// Walk the outline depth-first.
    ///
    /// The walk borrows the document; filtering or saving while it is alive
    /// fails with `document is busy`.
    ///
    /// # Errors
    ///
    /// Fails if the document is in use by a running filter.
    pub fn outline(&self) -> Result<Outline<'_>, PdfError> {
        Ok(OutlineWalker::new(self.outline_cursor()?))
    }

    /// A cursor on the first top-level outline item.
    ///
    /// # Errors
    ///
    /// Fails if the document is in use by a running filter.
    pub fn outline_cursor(&self) -> Result<OutlineCursorRef<'_>, PdfError> {
        Ok(LopdfOutlineCursor::new(self.inner.doc()?))
    }

    /// Begin a named operation.
    ///
    /// # Errors
    ///
    /// Returns a `Generic` engine error if an operation is already running.
    pub fn begin_operation(&self, name: &str) -> Result<(), PdfError> {
        let mut slot = self.inner.operation.borrow_mut();
        if let Some(running) = slot.as_ref() {
            return Err(PdfError::generic(format!(
                "operation already in progress: {}",
                running.name()
            )));
        }
        let mut operation = Operation::new(name);
        operation.start();
        debug!(operation = name, "begin operation");
        *slot = Some(operation);
        Ok(())
    }

    /// End the running operation and return its final state.
    ///
    /// # Errors
    ///
    /// Returns a `Generic` engine error if no operation is running.
    pub fn end_operation(&self) -> Result<Operation, PdfError> {
        let mut operation = self
            .inner
            .operation
            .borrow_mut()
            .take()
            .ok_or_else(|| PdfError::generic("no operation in progress"))?;
        operation.complete();
        debug!(%operation, "end operation");
        Ok(operation)
    }

    /// The running operation, if any.
    pub fn current_operation(&self) -> Option<Operation> {
        self.inner.operation.borrow().clone()
    }

    /// Filter a page's content through the factories in `options`.
    ///
    /// Runs inside the current operation, or in an implicit `Filter`
    /// operation when none is running. On failure the running operation is
    /// marked failed and the document is left unchanged and usable.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::HandlerInvocation`] when a factory or filter fails,
    /// panics, or is mis-declared, and engine errors for unusable pages.
    pub fn filter_page_contents(
        &self,
        page: &Page,
        options: &mut FilterOptions,
    ) -> Result<FilterSummary, PdfError> {
        let target = page.owned_by(&self.inner)?;
        let implicit = self.inner.operation.borrow().is_none();
        if implicit {
            self.begin_operation(IMPLICIT_FILTER_OPERATION)?;
        }

        let result = self.inner.doc_mut().and_then(|mut doc| {
            LopdfBackend::filter_page(&mut doc, &target, options).map_err(PdfError::from)
        });
        if let Err(err) = &result {
            warn!(page = target.index, error = %err, "content filtering failed");
            if let Some(operation) = self.inner.operation.borrow_mut().as_mut() {
                operation.fail();
            }
        }

        if implicit {
            self.end_operation()?;
        }
        result
    }

    /// Font resources used by a page.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the page resources are malformed.
    pub fn page_fonts(&self, page: &Page) -> Result<Vec<PageFont>, PdfError> {
        let target = page.owned_by(&self.inner)?;
        let doc = self.inner.doc()?;
        LopdfBackend::page_fonts(&doc, &target).map_err(PdfError::from)
    }

    /// Resolve the page's non-embedded fonts through the context's hooks.
    ///
    /// # Errors
    ///
    /// Returns the first hook failure as [`PdfError::HandlerInvocation`].
    pub fn resolve_page_fonts(
        &self,
        ctx: &mut Context,
        page: &Page,
    ) -> Result<Vec<FontResolution>, PdfError> {
        let fonts = self.page_fonts(page)?;
        resolve_fonts(ctx, fonts)
    }

    /// Write the document to a file.
    ///
    /// # Errors
    ///
    /// Returns a `System` engine error if the file cannot be written.
    #[cfg(feature = "std")]
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), PdfError> {
        let mut file = std::fs::File::create(path.as_ref())?;
        self.save_to(&mut file)
    }

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns an engine error if writing fails or the document is busy.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<(), PdfError> {
        let mut doc = self.inner.doc_mut()?;
        LopdfBackend::save_to(&mut doc, writer).map_err(PdfError::from)
    }

    /// Returns `true` if both handles share one document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn from_inner(inner: Rc<DocumentInner>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("pages", &self.inner.page_count.get())
            .field("locked", &self.inner.locked.get())
            .field("handles", &Rc::strong_count(&self.inner))
            .finish()
    }
}
