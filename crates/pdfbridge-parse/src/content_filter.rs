//! Content-stream filtering.
//!
//! A page's content stream is decoded into operations and grouped into
//! items: a path is its construction operators plus the painting operator,
//! each text-showing operator is one text item, and `Do`, inline images and
//! `sh` are single items. Every other operator is graphics or text state and
//! passes through untouched.
//!
//! Each factory in [`FilterOptions`] is asked for a filter per stream; the
//! filters form a chain in factory order and an item survives only if every
//! filter keeps it (later filters see only the survivors of earlier ones).
//! With `recurse`, the Form XObjects placed by a kept `Do` are filtered the
//! same way, each at most once per call.
//!
//! All rewritten streams are computed before any is written back, so a
//! failing handler leaves the document unchanged.

use std::collections::HashSet;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use pdfbridge_core::bridge::{self, CONTENT_FILTER, FILTER_FACTORY};
use pdfbridge_core::{
    ContentFilter, FactoryArgs, FilterContext, FilterItem, FilterOptions, ItemKind, Matrix,
    PdfError, Signature, StreamTarget,
};
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::lopdf_backend::{object_to_f64, resolve, resolve_inherited};

/// Counts reported by a filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Streams rewritten.
    pub streams: usize,
    /// Items presented to filter chains.
    pub items: usize,
    /// Items removed.
    pub removed: usize,
}

impl std::ops::AddAssign for FilterSummary {
    fn add_assign(&mut self, other: Self) {
        self.streams += other.streams;
        self.items += other.items;
        self.removed += other.removed;
    }
}

/// Where a rewritten stream is written back.
enum Rewrite {
    Page(Vec<u8>),
    Form(ObjectId, Vec<u8>),
}

/// A kept `Do` and the CTM in effect at it.
struct Placement {
    name: String,
    ctm: Matrix,
}

struct StreamOutcome {
    content: Option<Vec<u8>>,
    placements: Vec<Placement>,
    summary: FilterSummary,
}

/// A stream queued for filtering.
struct Pending<'a> {
    target: StreamTarget,
    object_id: Option<ObjectId>,
    content: Vec<u8>,
    resources: Option<&'a Dictionary>,
    transform: Matrix,
    struct_parents: Option<i64>,
}

pub(crate) fn filter_page(
    doc: &mut lopdf::Document,
    page_id: ObjectId,
    page_index: usize,
    options: &mut FilterOptions,
) -> Result<FilterSummary, BackendError> {
    if options.factory_count() == 0 {
        debug!(page = page_index, "no filter factories installed");
        return Ok(FilterSummary::default());
    }

    let (rewrites, summary) = plan_page(doc, page_id, page_index, options)?;
    for rewrite in rewrites {
        match rewrite {
            Rewrite::Page(bytes) => {
                let stream_id = doc.add_object(Stream::new(Dictionary::new(), bytes));
                doc.get_dictionary_mut(page_id)?.set("Contents", stream_id);
            }
            Rewrite::Form(id, bytes) => {
                let stream = doc.get_object_mut(id)?.as_stream_mut()?;
                stream.dict.remove(b"Filter");
                stream.dict.remove(b"DecodeParms");
                stream.set_content(bytes);
            }
        }
    }
    debug!(
        page = page_index,
        streams = summary.streams,
        items = summary.items,
        removed = summary.removed,
        "filtered page content"
    );
    Ok(summary)
}

/// Filter every stream reachable from the page without touching `doc`.
fn plan_page(
    doc: &lopdf::Document,
    page_id: ObjectId,
    page_index: usize,
    options: &mut FilterOptions,
) -> Result<(Vec<Rewrite>, FilterSummary), BackendError> {
    let page = doc.get_dictionary(page_id)?;
    let resources = resolve_inherited(doc, page_id, b"Resources")?
        .and_then(|r| resolve(doc, r).as_dict().ok());

    let mut queue = vec![Pending {
        target: StreamTarget::Page,
        object_id: None,
        content: page_content_bytes(doc, page)?,
        resources,
        transform: Matrix::identity(),
        struct_parents: integer_entry(page, b"StructParents"),
    }];
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut rewrites = Vec::new();
    let mut summary = FilterSummary::default();

    while let Some(stream) = queue.pop() {
        let ctx = FilterContext {
            page: page_index,
            target: stream.target.clone(),
            transform: stream.transform,
            struct_parents: stream.struct_parents,
        };
        let outcome = filter_stream(&stream.content, &ctx, options)?;
        summary += outcome.summary;
        if let Some(bytes) = outcome.content {
            rewrites.push(match stream.object_id {
                Some(id) => Rewrite::Form(id, bytes),
                None => Rewrite::Page(bytes),
            });
        }
        if !options.recurse {
            continue;
        }
        // Reverse so forms are processed in placement order.
        for placement in outcome.placements.iter().rev() {
            if let Some(form) = load_form(doc, stream.resources, placement, &mut visited)? {
                queue.push(form);
            }
        }
    }
    Ok((rewrites, summary))
}

/// Resolve a placement to a Form XObject not yet filtered.
fn load_form<'a>(
    doc: &'a lopdf::Document,
    resources: Option<&'a Dictionary>,
    placement: &Placement,
    visited: &mut HashSet<ObjectId>,
) -> Result<Option<Pending<'a>>, BackendError> {
    let Some(xobjects) = resources
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|x| resolve(doc, x).as_dict().ok())
    else {
        return Ok(None);
    };
    let id = match xobjects.get(placement.name.as_bytes()) {
        Ok(Object::Reference(id)) => *id,
        Ok(_) => {
            warn!(name = %placement.name, "skipping direct XObject that cannot be rewritten");
            return Ok(None);
        }
        Err(_) => return Ok(None),
    };
    let Ok(stream) = doc.get_object(id).and_then(|o| o.as_stream()) else {
        warn!(name = %placement.name, "XObject is missing or not a stream");
        return Ok(None);
    };
    let is_form = matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(s)) if s == b"Form");
    if !is_form || !visited.insert(id) {
        return Ok(None);
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

    Ok(Some(Pending {
        target: StreamTarget::Form(placement.name.clone()),
        object_id: Some(id),
        content: decode_stream(stream)?,
        resources: form_resources,
        transform: matrix.concat(&placement.ctm),
        struct_parents: integer_entry(&stream.dict, b"StructParents"),
    }))
}

/// Run one stream through the filter chain built for it.
fn filter_stream(
    content: &[u8],
    ctx: &FilterContext,
    options: &mut FilterOptions,
) -> Result<StreamOutcome, BackendError> {
    let mut chain = build_chain(options, ctx)?;
    let operations = Content::decode(content)
        .map_err(|e| BackendError::Content(format!("failed to decode content stream: {e}")))?
        .operations;

    let mut grouper = Grouper::new(ctx.transform);
    let expected = CONTENT_FILTER.to_signature();
    let mut summary = FilterSummary::default();
    let mut ops = operations.into_iter().peekable();

    while let Some(op) = ops.next() {
        let Some(kind) = grouper.classify(&op) else {
            grouper.pass(op);
            continue;
        };
        let mut group = if kind == ItemKind::Path {
            grouper.take_pending()
        } else {
            grouper.flush_pending();
            Vec::new()
        };
        group.push(op);
        if kind == ItemKind::InlineImage && group.last().is_some_and(|o| o.operator == "BI") {
            while let Some(next) = ops.next_if(|o| o.operator == "ID" || o.operator == "EI") {
                let done = next.operator == "EI";
                group.push(next);
                if done {
                    break;
                }
            }
        }

        let item = describe(summary.items, kind, &group);
        summary.items += 1;
        if decide(&mut chain, &expected, ctx, &item)? {
            if kind == ItemKind::XObject {
                if let Some(name) = &item.name {
                    grouper.placements.push(Placement {
                        name: name.clone(),
                        ctm: grouper.ctm,
                    });
                }
            }
            grouper.out.extend(group);
        } else {
            summary.removed += 1;
            grouper.out.extend(removal_residue(kind, group));
        }
    }
    grouper.flush_pending();

    let content = if chain.is_empty() {
        None
    } else {
        summary.streams = 1;
        Some(encode_operations(grouper.out)?)
    };
    Ok(StreamOutcome {
        content,
        placements: grouper.placements,
        summary,
    })
}

/// Serialize operations back into content-stream syntax.
///
/// An inline image decodes to a single `BI` operation carrying its
/// parameters and data as a stream operand; it is written back in
/// `BI ... ID <data> EI` form.
fn encode_operations(operations: Vec<Operation>) -> Result<Vec<u8>, BackendError> {
    fn append(out: &mut Vec<u8>, operations: Vec<Operation>) -> Result<(), BackendError> {
        if operations.is_empty() {
            return Ok(());
        }
        if !out.is_empty() {
            out.push(b'\n');
        }
        let encoded = Content { operations }
            .encode()
            .map_err(|e| BackendError::Content(format!("failed to encode content stream: {e}")))?;
        out.extend(encoded);
        Ok(())
    }

    let mut out = Vec::new();
    let mut run = Vec::new();
    for op in operations {
        let image = match op.operands.as_slice() {
            [Object::Stream(stream)] if op.operator == "BI" => stream,
            _ => {
                run.push(op);
                continue;
            }
        };
        append(&mut out, std::mem::take(&mut run))?;
        if !out.is_empty() {
            out.push(b'\n');
        }
        out.extend_from_slice(b"BI");
        let params: Vec<Object> = image
            .dict
            .iter()
            .filter(|(key, _)| key.as_slice() != b"Length")
            .flat_map(|(key, value)| [Object::Name(key.clone()), value.clone()])
            .collect();
        append(&mut out, vec![Operation::new("ID", params)])?;
        out.push(b'\n');
        out.extend_from_slice(&image.content);
        out.extend_from_slice(b"\nEI");
    }
    append(&mut out, run)?;
    Ok(out)
}

fn build_chain(
    options: &mut FilterOptions,
    args: &FactoryArgs,
) -> Result<Vec<Box<dyn ContentFilter>>, PdfError> {
    let expected = FILTER_FACTORY.to_signature();
    let mut chain = Vec::new();
    for factory in options.factories_mut() {
        let declared = factory.signature();
        if let Some(filter) = bridge::invoke(&expected, &declared, || factory.create(args))? {
            chain.push(filter);
        }
    }
    Ok(chain)
}

/// Ask the chain about one item; `true` keeps it.
fn decide(
    chain: &mut [Box<dyn ContentFilter>],
    expected: &Signature,
    ctx: &FilterContext,
    item: &FilterItem,
) -> Result<bool, PdfError> {
    for filter in chain.iter_mut() {
        let declared = filter.signature();
        let decision = bridge::invoke(expected, &declared, || filter.filter(ctx, item))?;
        if !decision.is_keep() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Operators that must stay when an item is removed.
///
/// A removed clipping path keeps its clip (`W n`); removed `'` and `"` keep
/// their line advance and spacing changes.
fn removal_residue(kind: ItemKind, mut group: Vec<Operation>) -> Vec<Operation> {
    match kind {
        ItemKind::Path if group.iter().any(|o| o.operator == "W" || o.operator == "W*") => {
            if let Some(paint) = group.last_mut() {
                *paint = Operation::new("n", vec![]);
            }
            group
        }
        ItemKind::Text => match group.pop() {
            Some(op) if op.operator == "'" => vec![Operation::new("T*", vec![])],
            Some(op) if op.operator == "\"" && op.operands.len() == 3 => {
                let mut operands = op.operands.into_iter();
                let aw = operands.next().unwrap_or(Object::Integer(0));
                let ac = operands.next().unwrap_or(Object::Integer(0));
                vec![
                    Operation::new("Tw", vec![aw]),
                    Operation::new("Tc", vec![ac]),
                    Operation::new("T*", vec![]),
                ]
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn describe(index: usize, kind: ItemKind, group: &[Operation]) -> FilterItem {
    let last = group.last();
    let operator = last.map(|o| o.operator.clone()).unwrap_or_default();
    let text = match kind {
        ItemKind::Text => last.map(shown_text),
        _ => None,
    };
    let name = match kind {
        ItemKind::XObject | ItemKind::Shading => last
            .and_then(|o| o.operands.first())
            .and_then(|n| n.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned()),
        _ => None,
    };
    FilterItem {
        index,
        kind,
        operator: if kind == ItemKind::InlineImage {
            "BI".to_string()
        } else {
            operator
        },
        operator_count: group.len(),
        text,
        name,
        clip: kind == ItemKind::Path && group.iter().any(|o| o.operator == "W" || o.operator == "W*"),
    }
}

/// Text shown by `Tj`, `TJ`, `'` or `"`, bytes decoded as Latin-1.
fn shown_text(op: &Operation) -> String {
    let string_operand = match op.operator.as_str() {
        "\"" => op.operands.get(2),
        _ => op.operands.first(),
    };
    let mut text = String::new();
    match string_operand {
        Some(Object::String(bytes, _)) => text.extend(bytes.iter().map(|&b| b as char)),
        Some(Object::Array(parts)) => {
            for part in parts {
                if let Object::String(bytes, _) = part {
                    text.extend(bytes.iter().map(|&b| b as char));
                }
            }
        }
        _ => {}
    }
    text
}

/// Tracks the operator groups and CTM of a stream while it is rewritten.
struct Grouper {
    out: Vec<Operation>,
    pending: Vec<Operation>,
    ctm: Matrix,
    base: Matrix,
    saved: Vec<Matrix>,
    placements: Vec<Placement>,
}

impl Grouper {
    fn new(base: Matrix) -> Self {
        Self {
            out: Vec::new(),
            pending: Vec::new(),
            ctm: base,
            base,
            saved: Vec::new(),
            placements: Vec::new(),
        }
    }

    /// The item kind completed by `op`, or `None` if `op` is not an item.
    fn classify(&self, op: &Operation) -> Option<ItemKind> {
        match op.operator.as_str() {
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => Some(ItemKind::Path),
            "Tj" | "TJ" | "'" | "\"" => Some(ItemKind::Text),
            "Do" => Some(ItemKind::XObject),
            "BI" | "ID" | "EI" => Some(ItemKind::InlineImage),
            "sh" => Some(ItemKind::Shading),
            _ => None,
        }
    }

    /// Path construction operators collected since the last item.
    fn take_pending(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.pending)
    }

    fn flush_pending(&mut self) {
        self.out.append(&mut self.pending);
    }

    /// Handle an operator that is not an item.
    fn pass(&mut self, op: Operation) {
        match op.operator.as_str() {
            "m" | "l" | "c" | "v" | "y" | "h" | "re" | "W" | "W*" => {
                self.pending.push(op);
                return;
            }
            "q" => self.saved.push(self.ctm),
            "Q" => self.ctm = self.saved.pop().unwrap_or(self.base),
            "cm" => {
                if let Some(m) = matrix_from_operands(&op.operands) {
                    self.ctm = m.concat(&self.ctm);
                }
            }
            _ => {}
        }
        self.flush_pending();
        self.out.push(op);
    }
}

pub(crate) fn matrix_from_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut values = [0.0; 6];
    for (slot, obj) in values.iter_mut().zip(operands) {
        *slot = object_to_f64(obj).ok()?;
    }
    Some(Matrix::from_array(values))
}

fn integer_entry(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key) {
        Ok(Object::Integer(n)) => Some(*n),
        _ => None,
    }
}

/// Get the content stream bytes from a page dictionary.
///
/// Handles both single stream references and arrays of stream references.
pub(crate) fn page_content_bytes(
    doc: &lopdf::Document,
    page: &Dictionary,
) -> Result<Vec<u8>, BackendError> {
    let contents = match page.get(b"Contents") {
        Ok(obj) => resolve(doc, obj),
        Err(_) => return Ok(Vec::new()),
    };
    match contents {
        Object::Stream(stream) => decode_stream(stream),
        Object::Array(parts) => {
            let mut content = Vec::new();
            for part in parts {
                let stream = resolve(doc, part).as_stream().map_err(|e| {
                    BackendError::Parse(format!("/Contents array item is not a stream: {e}"))
                })?;
                if !content.is_empty() {
                    content.push(b'\n');
                }
                content.extend_from_slice(&decode_stream(stream)?);
            }
            Ok(content)
        }
        Object::Null => Ok(Vec::new()),
        _ => Err(BackendError::Parse(
            "/Contents is not a stream or array".to_string(),
        )),
    }
}

/// Decode a content stream, decompressing if needed.
pub(crate) fn decode_stream(stream: &Stream) -> Result<Vec<u8>, BackendError> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| BackendError::Parse(format!("failed to decompress content stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}
