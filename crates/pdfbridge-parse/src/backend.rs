//! Document engine trait.
//!
//! Defines the [`PdfBackend`] trait that abstracts the engine operations the
//! facade drives. [`crate::LopdfBackend`] is the implementation used by
//! pdfbridge; the trait keeps the facade independent of lopdf types.

use std::io::Write;

use pdfbridge_core::{FilterOptions, Link, OpenOptions, PageFont, PdfError, Rect, StextPage};

use crate::content_filter::FilterSummary;

/// Trait abstracting document engine operations.
///
/// # Associated Types
///
/// - `Document`: The parsed document representation.
/// - `Page`: A reference to a single page within a document.
/// - `Error`: Backend-specific error type, convertible to [`PdfError`].
///
/// # Usage
///
/// ```ignore
/// let mut doc = MyBackend::open(pdf_bytes, &OpenOptions::default())?;
/// let page = MyBackend::get_page(&doc, 0)?;
/// let bound = MyBackend::page_bound(&doc, &page)?;
/// MyBackend::filter_page(&mut doc, &page, &mut options)?;
/// ```
pub trait PdfBackend {
    /// The parsed document type.
    type Document;

    /// A reference to a single page within a document.
    type Page;

    /// Backend-specific error type, convertible to [`PdfError`].
    type Error: std::error::Error + Into<PdfError>;

    /// Parse document bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes exceed `options.max_input_bytes`, do not
    /// parse, or `options.password` is given and wrong.
    fn open(bytes: &[u8], options: &OpenOptions) -> Result<Self::Document, Self::Error>;

    /// Return the number of pages in the document.
    fn page_count(doc: &Self::Document) -> usize;

    /// Returns `true` while the document is encrypted and not yet
    /// authenticated.
    fn needs_password(doc: &Self::Document) -> bool;

    /// Try a password. Returns `true` if the document is now readable.
    fn authenticate_password(doc: &mut Self::Document, password: &str) -> bool;

    /// Access a page by 0-based index.
    ///
    /// # Errors
    ///
    /// Returns an `Argument` engine error naming the 1-based page number if
    /// the index is out of range.
    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error>;

    /// Page bounds in page space.
    ///
    /// # Errors
    ///
    /// Returns an error if the page box is malformed.
    fn page_bound(doc: &Self::Document, page: &Self::Page) -> Result<Rect, Self::Error>;

    /// Look up a metadata key (`format`, `encryption`, `info:<Key>`).
    fn lookup_metadata(doc: &Self::Document, key: &str) -> Option<String>;

    /// Link annotations of a page, in annotation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the page's `/Annots` entry is malformed.
    fn page_links(doc: &Self::Document, page: &Self::Page) -> Result<Vec<Link>, Self::Error>;

    /// Font resources used by a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page's resources cannot be resolved.
    fn page_fonts(doc: &Self::Document, page: &Self::Page) -> Result<Vec<PageFont>, Self::Error>;

    /// Characters shown on a page, grouped into blocks and lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the page content cannot be decoded.
    fn page_text(doc: &Self::Document, page: &Self::Page) -> Result<StextPage, Self::Error>;

    /// Filter the page's content through the factories in `options`.
    ///
    /// Rewritten streams are applied only when every handler succeeded.
    ///
    /// # Errors
    ///
    /// Returns the first handler or content error; the document is left
    /// unchanged.
    fn filter_page(
        doc: &mut Self::Document,
        page: &Self::Page,
        options: &mut FilterOptions,
    ) -> Result<FilterSummary, Self::Error>;

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save_to<W: Write>(doc: &mut Self::Document, writer: &mut W) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfbridge_core::{ErrorCode, FilterDecision, ItemKind, filter_fn};

    #[derive(Debug)]
    struct MockDocument {
        pages: Vec<Rect>,
        password: Option<String>,
        unlocked: bool,
        saved: usize,
    }

    #[derive(Debug)]
    struct MockPage {
        index: usize,
    }

    struct MockBackend;

    impl PdfBackend for MockBackend {
        type Document = MockDocument;
        type Page = MockPage;
        type Error = PdfError;

        fn open(bytes: &[u8], options: &OpenOptions) -> Result<Self::Document, Self::Error> {
            if bytes.is_empty() {
                return Err(PdfError::engine(ErrorCode::Format, "empty input"));
            }
            // Mock: first byte encodes page count, the rest is the password.
            let pages = vec![Rect::new(0.0, 0.0, 612.0, 792.0); bytes[0] as usize];
            let password = (bytes.len() > 1).then(|| String::from_utf8_lossy(&bytes[1..]).into());
            let mut doc = MockDocument {
                pages,
                unlocked: password.is_none(),
                password,
                saved: 0,
            };
            if let Some(pw) = &options.password {
                if !Self::authenticate_password(&mut doc, pw) {
                    return Err(PdfError::generic("invalid password"));
                }
            }
            Ok(doc)
        }

        fn page_count(doc: &Self::Document) -> usize {
            doc.pages.len()
        }

        fn needs_password(doc: &Self::Document) -> bool {
            !doc.unlocked
        }

        fn authenticate_password(doc: &mut Self::Document, password: &str) -> bool {
            if doc.password.as_deref().is_none_or(|p| p == password) {
                doc.unlocked = true;
            }
            doc.unlocked
        }

        fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
            if index >= doc.pages.len() {
                return Err(PdfError::argument(format!(
                    "invalid page number: {}",
                    index + 1
                )));
            }
            Ok(MockPage { index })
        }

        fn page_bound(doc: &Self::Document, page: &Self::Page) -> Result<Rect, Self::Error> {
            Ok(doc.pages[page.index])
        }

        fn lookup_metadata(_doc: &Self::Document, key: &str) -> Option<String> {
            (key == "format").then(|| "PDF 1.7".to_string())
        }

        fn page_links(_doc: &Self::Document, _page: &Self::Page) -> Result<Vec<Link>, Self::Error> {
            Ok(vec![Link::new(Rect::new(0.0, 0.0, 10.0, 10.0), "#page=1")])
        }

        fn page_fonts(
            _doc: &Self::Document,
            _page: &Self::Page,
        ) -> Result<Vec<PageFont>, Self::Error> {
            Ok(Vec::new())
        }

        fn page_text(doc: &Self::Document, page: &Self::Page) -> Result<StextPage, Self::Error> {
            Ok(StextPage {
                bound: doc.pages[page.index],
                blocks: Vec::new(),
            })
        }

        fn filter_page(
            _doc: &mut Self::Document,
            page: &Self::Page,
            options: &mut FilterOptions,
        ) -> Result<FilterSummary, Self::Error> {
            Ok(FilterSummary {
                streams: usize::from(options.factory_count() > 0) + page.index,
                ..FilterSummary::default()
            })
        }

        fn save_to<W: Write>(doc: &mut Self::Document, writer: &mut W) -> Result<(), Self::Error> {
            doc.saved += 1;
            writer.write_all(b"%PDF-1.7\n")?;
            Ok(())
        }
    }

    #[test]
    fn mock_open_and_count() {
        let doc = MockBackend::open(&[3], &OpenOptions::default()).unwrap();
        assert_eq!(MockBackend::page_count(&doc), 3);
        assert!(!MockBackend::needs_password(&doc));
    }

    #[test]
    fn mock_open_empty_fails() {
        let err = MockBackend::open(&[], &OpenOptions::default()).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Format));
    }

    #[test]
    fn mock_invalid_page_number() {
        let doc = MockBackend::open(&[1], &OpenOptions::default()).unwrap();
        let err = MockBackend::get_page(&doc, 1).unwrap_err();
        assert_eq!(err.to_string(), "code=4: invalid page number: 2");
    }

    #[test]
    fn mock_password_flow() {
        let bytes = [1, b'p', b'w'];
        let mut doc = MockBackend::open(&bytes, &OpenOptions::default()).unwrap();
        assert!(MockBackend::needs_password(&doc));
        assert!(!MockBackend::authenticate_password(&mut doc, "nope"));
        assert!(MockBackend::authenticate_password(&mut doc, "pw"));
        assert!(!MockBackend::needs_password(&doc));

        let err = MockBackend::open(&bytes, &OpenOptions::new().password("x")).unwrap_err();
        assert_eq!(err.to_string(), "code=1: invalid password");
    }

    #[test]
    fn mock_filter_and_save_through_trait() {
        let mut doc = MockBackend::open(&[2], &OpenOptions::default()).unwrap();
        let page = MockBackend::get_page(&doc, 1).unwrap();
        let mut options = FilterOptions::default();
        options.add_factory(pdfbridge_core::FnFactory::new(|_| {
            let filter = filter_fn(|_, item| Ok(FilterDecision::from(item.kind != ItemKind::Text)));
            Ok(Some(Box::new(filter) as Box<dyn pdfbridge_core::ContentFilter>))
        }));
        let summary = MockBackend::filter_page(&mut doc, &page, &mut options).unwrap();
        assert_eq!(summary.streams, 2);

        let mut out = Vec::new();
        MockBackend::save_to(&mut doc, &mut out).unwrap();
        assert_eq!(doc.saved, 1);
        assert!(out.starts_with(b"%PDF"));
    }

    #[test]
    fn mock_metadata_and_links() {
        let doc = MockBackend::open(&[1], &OpenOptions::default()).unwrap();
        let page = MockBackend::get_page(&doc, 0).unwrap();
        assert_eq!(
            MockBackend::lookup_metadata(&doc, "format").as_deref(),
            Some("PDF 1.7")
        );
        assert_eq!(MockBackend::lookup_metadata(&doc, "info:Title"), None);
        assert_eq!(MockBackend::page_links(&doc, &page).unwrap()[0].uri, "#page=1");
        assert_eq!(MockBackend::page_bound(&doc, &page).unwrap().width(), 612.0);
        assert!(MockBackend::page_text(&doc, &page).unwrap().blocks.is_empty());
    }
}
