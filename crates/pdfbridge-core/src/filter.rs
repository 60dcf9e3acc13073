//! Content-stream filtering handlers.
//!
//! A filtering operation presents each content item of a stream (a text
//! show, a painted path, an XObject placement, an inline image, a shading) to
//! the filters of a [`FilterOptions`]. Filters are produced per stream by
//! [`FilterFactory`] handlers and decide [`FilterDecision::Keep`] or
//! [`FilterDecision::Remove`]. Graphics-state and marked-content operators are
//! not content items and always pass through.

use std::fmt;

use crate::bridge::{CONTENT_FILTER, FILTER_FACTORY, Signature};
use crate::{HandlerError, Matrix};

/// What a filter decided for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Keep,
    Remove,
}

impl FilterDecision {
    pub fn is_keep(self) -> bool {
        self == FilterDecision::Keep
    }
}

/// `true` keeps the item.
impl From<bool> for FilterDecision {
    fn from(keep: bool) -> Self {
        if keep {
            FilterDecision::Keep
        } else {
            FilterDecision::Remove
        }
    }
}

/// Category of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// `Tj`, `TJ`, `'` or `"`.
    Text,
    /// Path construction operators together with their painting operator.
    Path,
    /// `Do`.
    XObject,
    /// `BI` … `EI`.
    InlineImage,
    /// `sh`.
    Shading,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemKind::Text => "text",
            ItemKind::Path => "path",
            ItemKind::XObject => "xobject",
            ItemKind::InlineImage => "inline-image",
            ItemKind::Shading => "shading",
        };
        f.write_str(s)
    }
}

/// One content item as seen by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterItem {
    /// 0-based position among the content items of the stream.
    pub index: usize,
    pub kind: ItemKind,
    /// The operator that completes the item (`Tj`, `f`, `Do`, ...).
    pub operator: String,
    /// Number of operators the item spans.
    pub operator_count: usize,
    /// Shown text for text items, bytes decoded as Latin-1.
    pub text: Option<String>,
    /// Resource name for XObject and shading items.
    pub name: Option<String>,
    /// For path items: whether the path also sets the clip (`W`/`W*`).
    pub clip: bool,
}

/// Which stream a filter is running over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// The page's own content stream.
    Page,
    /// A Form XObject used by the page, by resource name.
    Form(String),
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTarget::Page => f.write_str("page"),
            StreamTarget::Form(name) => write!(f, "form /{name}"),
        }
    }
}

/// Per-stream arguments passed to factories and filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterContext {
    /// 0-based page index.
    pub page: usize,
    pub target: StreamTarget,
    /// Transform from the stream's space to page space.
    pub transform: Matrix,
    /// `/StructParents` key of the page or form, if any.
    pub struct_parents: Option<i64>,
}

/// Arguments of the filter-factory extension point.
pub type FactoryArgs = FilterContext;

/// A per-item content filter.
///
/// Filters may keep private state between calls; they are created fresh for
/// each stream by their factory.
pub trait ContentFilter {
    /// Declared signature; must match [`CONTENT_FILTER`].
    fn signature(&self) -> Signature {
        CONTENT_FILTER.to_signature()
    }

    fn filter(
        &mut self,
        ctx: &FilterContext,
        item: &FilterItem,
    ) -> Result<FilterDecision, HandlerError>;
}

/// Produces a [`ContentFilter`] for each stream being filtered.
pub trait FilterFactory {
    /// Declared signature; must match [`FILTER_FACTORY`].
    fn signature(&self) -> Signature {
        FILTER_FACTORY.to_signature()
    }

    /// Create a filter for the stream described by `args`, or `None` to leave
    /// the stream to the other factories.
    fn create(&mut self, args: &FactoryArgs)
    -> Result<Option<Box<dyn ContentFilter>>, HandlerError>;
}

/// Closure adapter for [`ContentFilter`], see [`filter_fn`].
pub struct FnFilter<F> {
    f: F,
}

/// Wrap a closure as a content filter.
pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: FnMut(&FilterContext, &FilterItem) -> Result<FilterDecision, HandlerError>,
{
    FnFilter { f }
}

impl<F> ContentFilter for FnFilter<F>
where
    F: FnMut(&FilterContext, &FilterItem) -> Result<FilterDecision, HandlerError>,
{
    fn filter(
        &mut self,
        ctx: &FilterContext,
        item: &FilterItem,
    ) -> Result<FilterDecision, HandlerError> {
        (self.f)(ctx, item)
    }
}

/// Consults the inner closure for text items only; everything else is kept.
pub struct TextFilter<F> {
    f: F,
}

impl<F> TextFilter<F>
where
    F: FnMut(&FilterContext, &FilterItem) -> Result<FilterDecision, HandlerError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ContentFilter for TextFilter<F>
where
    F: FnMut(&FilterContext, &FilterItem) -> Result<FilterDecision, HandlerError>,
{
    fn filter(
        &mut self,
        ctx: &FilterContext,
        item: &FilterItem,
    ) -> Result<FilterDecision, HandlerError> {
        if item.kind == ItemKind::Text {
            (self.f)(ctx, item)
        } else {
            Ok(FilterDecision::Keep)
        }
    }
}

/// Keeps the first item, removes the second, and so on.
#[derive(Debug, Clone, Default)]
pub struct AlternatingFilter {
    seen: usize,
}

impl AlternatingFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentFilter for AlternatingFilter {
    fn filter(
        &mut self,
        _ctx: &FilterContext,
        _item: &FilterItem,
    ) -> Result<FilterDecision, HandlerError> {
        let keep = self.seen % 2 == 0;
        self.seen += 1;
        Ok(keep.into())
    }
}

/// Removes every item of the given kinds.
#[derive(Debug, Clone, Default)]
pub struct KindFilter {
    remove: Vec<ItemKind>,
}

impl KindFilter {
    pub fn removing(kinds: impl IntoIterator<Item = ItemKind>) -> Self {
        Self {
            remove: kinds.into_iter().collect(),
        }
    }
}

impl ContentFilter for KindFilter {
    fn filter(
        &mut self,
        _ctx: &FilterContext,
        item: &FilterItem,
    ) -> Result<FilterDecision, HandlerError> {
        Ok((!self.remove.contains(&item.kind)).into())
    }
}

/// Closure adapter for [`FilterFactory`]: the closure builds a filter for
/// every stream.
pub struct FnFactory<F> {
    f: F,
}

impl<F> FnFactory<F>
where
    F: FnMut(&FactoryArgs) -> Result<Option<Box<dyn ContentFilter>>, HandlerError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FilterFactory for FnFactory<F>
where
    F: FnMut(&FactoryArgs) -> Result<Option<Box<dyn ContentFilter>>, HandlerError>,
{
    fn create(
        &mut self,
        args: &FactoryArgs,
    ) -> Result<Option<Box<dyn ContentFilter>>, HandlerError> {
        (self.f)(args)
    }
}

/// Factory producing a fresh default-constructed filter per stream.
pub fn per_stream<T>() -> impl FilterFactory
where
    T: ContentFilter + Default + 'static,
{
    FnFactory::new(|_args: &FactoryArgs| Ok(Some(Box::new(T::default()) as Box<dyn ContentFilter>)))
}

/// Options for a filtering operation.
///
/// # Example
///
/// ```ignore
/// let mut options = FilterOptions::default();
/// options.recurse = true;
/// options.add_factory(per_stream::<AlternatingFilter>());
/// document.filter_page_contents(&page, &mut options)?;
/// ```
#[derive(Default)]
pub struct FilterOptions {
    /// Also filter the Form XObjects placed by the stream (default: false).
    pub recurse: bool,
    factories: Vec<Box<dyn FilterFactory>>,
}

impl FilterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory; filters chain in installation order.
    pub fn add_factory(&mut self, factory: impl FilterFactory + 'static) -> &mut Self {
        self.factories.push(Box::new(factory));
        self
    }

    /// Remove every factory, leaving streams unfiltered.
    pub fn clear_factories(&mut self) {
        self.factories.clear();
    }

    pub fn factories_mut(&mut self) -> &mut [Box<dyn FilterFactory>] {
        &mut self.factories
    }

    pub fn factory_count(&self) -> usize {
        self.factories.len()
    }
}

impl fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOptions")
            .field("recurse", &self.recurse)
            .field("factories", &self.factories.len())
            .finish()
    }
}
