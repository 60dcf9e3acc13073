//! pdfbridge-core: backend-independent types and protocols.
//!
//! This crate holds the error taxonomy shared by every pdfbridge crate, the
//! outline cursor protocol and its lazy pre-order walker, the handler bridge
//! that checks and invokes caller-supplied callbacks, and the plain data
//! types (geometry, links, fonts, bitmaps, page text) passed across those
//! seams.

pub mod bitmap;
pub mod bridge;
pub mod error;
pub mod filter;
pub mod font;
pub mod geometry;
pub mod link;
pub mod operation;
pub mod options;
pub mod outline;
pub mod text;

pub use bitmap::{Bitmap, BitmapDetails};
pub use bridge::{FixedSignature, Signature};
pub use error::{ErrorCode, HandlerError, PdfError};
pub use filter::{
    AlternatingFilter, ContentFilter, FactoryArgs, FilterContext, FilterDecision, FilterFactory,
    FilterItem, FilterOptions, FnFactory, FnFilter, ItemKind, KindFilter, StreamTarget,
    TextFilter, filter_fn, per_stream,
};
pub use font::{
    CjkOrdering, CjkRequest, FallbackRequest, Font, FontHook, FontRequest, PageFont, Script,
    SystemFontFuncs,
};
pub use geometry::{Matrix, Point, Rect};
pub use link::Link;
pub use operation::{Operation, OperationState};
pub use options::OpenOptions;
pub use outline::{
    Move, OutlineCursor, OutlineEntry, OutlineItem, OutlineNode, OutlineWalker, TreeCursor,
};
pub use text::{
    Quad, SearchHit, StextBuilder, StextPage, TextBlock, TextChar, TextLine, search_stext,
};
