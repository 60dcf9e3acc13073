//! pdfbridge-parse: lopdf document engine.
//!
//! This crate implements the engine seam of pdfbridge: the [`PdfBackend`]
//! trait and its lopdf implementation (page tree, metadata, link and font
//! extraction, saving), the [`LopdfOutlineCursor`] over a document's outline
//! tree, content-stream filtering, and page text extraction. It depends on pdfbridge-core for
//! shared data types.

pub mod backend;
pub mod content_filter;
pub mod error;
mod fonts;
pub mod lopdf_backend;
pub mod outline_cursor;
mod text_extract;

pub use backend::PdfBackend;
pub use content_filter::FilterSummary;
pub use error::BackendError;
pub use lopdf_backend::{LopdfBackend, LopdfDocument, LopdfPage};
pub use outline_cursor::LopdfOutlineCursor;
pub use pdfbridge_core;
