//! pdfbridge: drive a PDF engine through typed handles.
//!
//! This is the public API facade crate. It re-exports types from
//! pdfbridge-core and uses pdfbridge-parse as the document engine.
//!
//! # Architecture
//!
//! - **pdfbridge-core**: Error taxonomy, outline cursor protocol and walker,
//!   handler bridge, filter and font-hook traits
//! - **pdfbridge-parse**: The lopdf engine behind the `PdfBackend` seam
//! - **pdfbridge** (this crate): [`Context`], shared [`Document`] handles and
//!   derived [`Page`] handles, with page text and search on the page

mod context;
mod document;
mod fonts;
mod page;

pub use context::Context;
pub use document::{Document, Outline, OutlineCursorRef};
pub use fonts::{FontResolution, FontSource};
pub use page::Page;

pub use pdfbridge_core::{
    AlternatingFilter, Bitmap, BitmapDetails, CjkOrdering, ContentFilter, ErrorCode, FactoryArgs,
    FilterContext, FilterDecision, FilterFactory, FilterItem, FilterOptions, FnFactory, Font,
    FontHook, HandlerError, ItemKind, KindFilter, Link, Matrix, Move, OpenOptions, Operation,
    OperationState, OutlineCursor, OutlineEntry, OutlineItem, OutlineWalker, PageFont, PdfError,
    Point, Quad, Rect, Script, SearchHit, Signature, StextPage, StreamTarget, SystemFontFuncs,
    TextBlock, TextChar, TextFilter, TextLine, bridge, filter_fn, per_stream, search_stext,
};
pub use pdfbridge_parse::FilterSummary;

pub use pdfbridge_core;
pub use pdfbridge_parse;
