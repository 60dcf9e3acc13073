//! Outline cursor over a lopdf document's `/Outlines` tree.
//!
//! The cursor follows `/First` and `/Next` links and keeps the path from the
//! top level to the current item, so `up` needs no `/Parent` lookup. Moving
//! onto an item that is already on the path, or that was already visited
//! among the current siblings, is reported as an iterator error, as is a
//! link to a missing object.

use std::collections::HashSet;
use std::ops::Deref;

use lopdf::{Dictionary, Object, ObjectId};
use pdfbridge_core::{Move, OutlineCursor, OutlineItem, PdfError};

use crate::lopdf_backend::{LopdfDocument, resolve, resolve_target, text_string_entry};

#[derive(Debug, Clone)]
struct Level {
    node: ObjectId,
    /// Siblings visited at this level since the cursor entered it.
    seen: HashSet<ObjectId>,
}

impl Level {
    fn new(node: ObjectId) -> Self {
        Self {
            node,
            seen: HashSet::from([node]),
        }
    }
}

/// A cursor over the outline of a [`LopdfDocument`].
///
/// `D` is any handle dereferencing to the document: a plain reference, or a
/// `RefCell` guard held by the facade.
pub struct LopdfOutlineCursor<D> {
    doc: D,
    path: Vec<Level>,
}

impl<D: Deref<Target = LopdfDocument>> LopdfOutlineCursor<D> {
    /// Position a cursor on the first top-level item, if any.
    pub fn new(doc: D) -> Self {
        let first = first_outline_item(doc.inner());
        Self {
            doc,
            path: first.map(Level::new).into_iter().collect(),
        }
    }

    fn node_dict(&self, id: ObjectId) -> Result<&Dictionary, PdfError> {
        let obj = self.doc.inner().get_object(id).map_err(|_| {
            PdfError::iterator(format!("dangling outline reference {} {} R", id.0, id.1))
        })?;
        obj.as_dict().map_err(|_| {
            PdfError::iterator(format!(
                "outline item {} {} R is not a dictionary",
                id.0, id.1
            ))
        })
    }

    fn link(&self, from: ObjectId, key: &[u8]) -> Result<Option<ObjectId>, PdfError> {
        match self.node_dict(from)?.get(key) {
            Ok(Object::Reference(id)) => Ok(Some(*id)),
            _ => Ok(None),
        }
    }

    fn on_path(&self, id: ObjectId) -> bool {
        self.path.iter().any(|level| level.node == id)
    }
}

fn cycle_error(id: ObjectId) -> PdfError {
    PdfError::iterator(format!("cycle in outline at {} {} R", id.0, id.1))
}

impl<D: Deref<Target = LopdfDocument>> OutlineCursor for LopdfOutlineCursor<D> {
    fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
        let Some(level) = self.path.last() else {
            return Ok(None);
        };
        let inner = self.doc.inner();
        let dict = self.node_dict(level.node)?;
        let title = text_string_entry(inner, dict, b"Title").unwrap_or_default();
        let is_open = matches!(dict.get(b"Count"), Ok(Object::Integer(n)) if *n > 0);
        let mut item = OutlineItem::new(title).open(is_open);
        item.uri = resolve_target(inner, self.doc.page_ids(), dict);
        Ok(Some(item))
    }

    fn down(&mut self) -> Result<Move, PdfError> {
        let Some(level) = self.path.last() else {
            return Ok(Move::Blocked);
        };
        let Some(child) = self.link(level.node, b"First")? else {
            return Ok(Move::Blocked);
        };
        if self.on_path(child) {
            return Err(cycle_error(child));
        }
        self.node_dict(child)?;
        self.path.push(Level::new(child));
        Ok(Move::Moved)
    }

    fn next(&mut self) -> Result<Move, PdfError> {
        let Some(level) = self.path.last() else {
            return Ok(Move::Blocked);
        };
        let Some(sibling) = self.link(level.node, b"Next")? else {
            return Ok(Move::Blocked);
        };
        if level.seen.contains(&sibling) || self.on_path(sibling) {
            return Err(cycle_error(sibling));
        }
        self.node_dict(sibling)?;
        if let Some(level) = self.path.last_mut() {
            level.node = sibling;
            level.seen.insert(sibling);
        }
        Ok(Move::Moved)
    }

    fn up(&mut self) -> Result<Move, PdfError> {
        if self.path.len() <= 1 {
            return Ok(Move::Blocked);
        }
        self.path.pop();
        Ok(Move::Moved)
    }

    fn depth(&self) -> usize {
        self.path.len().saturating_sub(1)
    }
}

/// `/First` of the catalog's `/Outlines` dictionary.
fn first_outline_item(doc: &lopdf::Document) -> Option<ObjectId> {
    let catalog = resolve(doc, doc.trailer.get(b"Root").ok()?).as_dict().ok()?;
    let outlines = resolve(doc, catalog.get(b"Outlines").ok()?).as_dict().ok()?;
    outlines.get(b"First").ok()?.as_reference().ok()
}
