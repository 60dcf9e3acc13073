//! Document outline (bookmarks) and the cursor protocol used to walk it.
//!
//! An outline is exposed by the engine as an [`OutlineCursor`]: a position in
//! the tree that can move `down` to the first child, to the `next` sibling, or
//! `up` to the parent. [`OutlineWalker`] turns any cursor into a lazy,
//! depth-first, pre-order iterator without recursion.
//!
//! [`OutlineNode`] and [`TreeCursor`] provide an in-memory tree implementing
//! the same protocol.

use crate::PdfError;

/// A single entry in the document outline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlineItem {
    /// The entry's title text.
    pub title: String,
    /// Link target: an external URI, `#page=N` for in-document
    /// destinations, or a named destination.
    pub uri: Option<String>,
    /// Whether the entry's children are shown expanded.
    pub is_open: bool,
}

impl OutlineItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: None,
            is_open: false,
        }
    }

    /// Set the link target (builder pattern).
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the open flag (builder pattern).
    pub fn open(mut self, is_open: bool) -> Self {
        self.is_open = is_open;
        self
    }
}

/// An outline item together with its nesting depth (0 = top level).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlineEntry {
    pub depth: usize,
    pub item: OutlineItem,
}

/// Result of a cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// The cursor moved to the requested position.
    Moved,
    /// There was nothing to move to; the cursor is unchanged.
    Blocked,
}

impl Move {
    pub fn is_moved(self) -> bool {
        self == Move::Moved
    }

    /// Signed status code: `0` for a move, `-1` when blocked.
    pub fn code(self) -> i32 {
        match self {
            Move::Moved => 0,
            Move::Blocked => -1,
        }
    }
}

/// A stateful position inside an outline tree.
///
/// All operations may fail with [`PdfError::Iterator`] when the underlying
/// position cannot be resolved.
pub trait OutlineCursor {
    /// The item at the current position, or `None` if the position holds no
    /// item (only the case for an empty outline).
    fn item(&mut self) -> Result<Option<OutlineItem>, PdfError>;

    /// Move to the first child of the current item.
    fn down(&mut self) -> Result<Move, PdfError>;

    /// Move to the next sibling of the current item.
    fn next(&mut self) -> Result<Move, PdfError>;

    /// Move to the parent of the current item. Blocked at depth 0.
    fn up(&mut self) -> Result<Move, PdfError>;

    /// Current depth; never negative, 0 for top-level items.
    fn depth(&self) -> usize;
}

impl<C: OutlineCursor + ?Sized> OutlineCursor for &mut C {
    fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
        (**self).item()
    }

    fn down(&mut self) -> Result<Move, PdfError> {
        (**self).down()
    }

    fn next(&mut self) -> Result<Move, PdfError> {
        (**self).next()
    }

    fn up(&mut self) -> Result<Move, PdfError> {
        (**self).up()
    }

    fn depth(&self) -> usize {
        (**self).depth()
    }
}

/// Depth-first, pre-order traversal over an [`OutlineCursor`].
///
/// The walker keeps its own depth counter and only uses the four cursor
/// primitives. It yields each valid item once, in the order a recursive
/// pre-order traversal would, and ends when `up()` is blocked at the top
/// level. It is fused: after the end, or after the first error, it yields
/// `None`.
///
/// The cursor only moves past an item when the entry after it is requested,
/// so an item is delivered before any failure to leave it is reported.
///
/// The walker trusts the cursor to describe a finite tree; cycles must be
/// rejected by the cursor.
pub struct OutlineWalker<C> {
    cursor: C,
    depth: usize,
    done: bool,
    /// The item under the cursor has already been yielded.
    yielded: bool,
}

impl<C: OutlineCursor> OutlineWalker<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            depth: 0,
            done: false,
            yielded: false,
        }
    }

    /// Give back the underlying cursor.
    pub fn into_inner(self) -> C {
        self.cursor
    }

    /// Move to the position after the current one in pre-order.
    ///
    /// Returns `false` when the traversal is complete.
    fn advance(&mut self) -> Result<bool, PdfError> {
        if self.cursor.down()?.is_moved() {
            self.depth += 1;
            return Ok(true);
        }
        if self.cursor.next()?.is_moved() {
            return Ok(true);
        }
        // No children and no later sibling: climb until some ancestor has a
        // next sibling. An ancestor without one just means climbing further.
        loop {
            if !self.cursor.up()?.is_moved() {
                return Ok(false);
            }
            self.depth = self.depth.saturating_sub(1);
            if self.cursor.next()?.is_moved() {
                return Ok(true);
            }
        }
    }

    fn step(&mut self) -> Result<Option<OutlineEntry>, PdfError> {
        while !self.done {
            if self.yielded {
                self.yielded = false;
                if !self.advance()? {
                    self.done = true;
                    break;
                }
            }
            let depth = self.depth;
            let item = self.cursor.item()?;
            self.yielded = true;
            if let Some(item) = item {
                return Ok(Some(OutlineEntry { depth, item }));
            }
        }
        Ok(None)
    }
}

impl<C: OutlineCursor> Iterator for OutlineWalker<C> {
    type Item = Result<OutlineEntry, PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<C: OutlineCursor> std::iter::FusedIterator for OutlineWalker<C> {}

/// A node of an in-memory outline tree.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlineNode {
    pub item: OutlineItem,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn leaf(item: OutlineItem) -> Self {
        Self {
            item,
            children: Vec::new(),
        }
    }

    pub fn with_children(item: OutlineItem, children: Vec<OutlineNode>) -> Self {
        Self { item, children }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::len).sum::<usize>()
    }

    /// Recursive pre-order listing of a forest, starting at `depth`.
    pub fn flatten(nodes: &[OutlineNode], depth: usize) -> Vec<OutlineEntry> {
        let mut out = Vec::new();
        for node in nodes {
            out.push(OutlineEntry {
                depth,
                item: node.item.clone(),
            });
            out.extend(Self::flatten(&node.children, depth + 1));
        }
        out
    }
}

/// [`OutlineCursor`] over a borrowed in-memory forest.
///
/// The position is the path of sibling indices from the top level down to
/// the current node.
#[derive(Debug, Clone)]
pub struct TreeCursor<'a> {
    roots: &'a [OutlineNode],
    path: Vec<usize>,
}

impl<'a> TreeCursor<'a> {
    pub fn new(roots: &'a [OutlineNode]) -> Self {
        Self {
            roots,
            path: vec![0],
        }
    }

    fn siblings(&self) -> Result<&'a [OutlineNode], PdfError> {
        let mut level = self.roots;
        for &index in &self.path[..self.path.len() - 1] {
            level = &level
                .get(index)
                .ok_or_else(|| PdfError::iterator(format!("no node at index {index}")))?
                .children;
        }
        Ok(level)
    }

    fn current(&self) -> Result<Option<&'a OutlineNode>, PdfError> {
        let index = self.path[self.path.len() - 1];
        Ok(self.siblings()?.get(index))
    }
}

impl OutlineCursor for TreeCursor<'_> {
    fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
        Ok(self.current()?.map(|node| node.item.clone()))
    }

    fn down(&mut self) -> Result<Move, PdfError> {
        match self.current()? {
            Some(node) if !node.children.is_empty() => {
                self.path.push(0);
                Ok(Move::Moved)
            }
            _ => Ok(Move::Blocked),
        }
    }

    fn next(&mut self) -> Result<Move, PdfError> {
        let len = self.siblings()?.len();
        let last = self.path.len() - 1;
        if self.path[last] + 1 < len {
            self.path[last] += 1;
            Ok(Move::Moved)
        } else {
            Ok(Move::Blocked)
        }
    }

    fn up(&mut self) -> Result<Move, PdfError> {
        if self.path.len() > 1 {
            self.path.pop();
            Ok(Move::Moved)
        } else {
            Ok(Move::Blocked)
        }
    }

    fn depth(&self) -> usize {
        self.path.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, children: Vec<OutlineNode>) -> OutlineNode {
        OutlineNode::with_children(OutlineItem::new(title), children)
    }

    fn walk(roots: &[OutlineNode]) -> Vec<OutlineEntry> {
        OutlineWalker::new(TreeCursor::new(roots))
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn titles(entries: &[OutlineEntry]) -> Vec<(usize, &str)> {
        entries
            .iter()
            .map(|e| (e.depth, e.item.title.as_str()))
            .collect()
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let mut walker = OutlineWalker::new(TreeCursor::new(&[]));
        assert!(walker.next().is_none());
        assert!(walker.next().is_none());
    }

    #[test]
    fn single_root_yields_one_item() {
        let roots = vec![node("Only", vec![])];
        let entries = walk(&roots);
        assert_eq!(titles(&entries), vec![(0, "Only")]);
    }

    #[test]
    fn nested_tree_in_pre_order() {
        let roots = vec![
            node(
                "1",
                vec![node("1.1", vec![node("1.1.1", vec![])]), node("1.2", vec![])],
            ),
            node("2", vec![]),
            node("3", vec![node("3.1", vec![])]),
        ];
        let entries = walk(&roots);
        assert_eq!(
            titles(&entries),
            vec![
                (0, "1"),
                (1, "1.1"),
                (2, "1.1.1"),
                (1, "1.2"),
                (0, "2"),
                (0, "3"),
                (1, "3.1"),
            ]
        );
        assert_eq!(entries, OutlineNode::flatten(&roots, 0));
    }

    #[test]
    fn deep_last_child_climbs_through_ancestors_without_siblings() {
        // "a.1.1" is the last node at every level; finishing it needs two
        // `up` moves whose following `next` is blocked before ending.
        let roots = vec![node("a", vec![node("a.1", vec![node("a.1.1", vec![])])])];
        let entries = walk(&roots);
        assert_eq!(titles(&entries), vec![(0, "a"), (1, "a.1"), (2, "a.1.1")]);
    }

    #[test]
    fn climbing_resumes_at_ancestor_sibling() {
        let roots = vec![
            node("a", vec![node("a.1", vec![node("a.1.1", vec![])])]),
            node("b", vec![]),
        ];
        let entries = walk(&roots);
        assert_eq!(
            titles(&entries),
            vec![(0, "a"), (1, "a.1"), (2, "a.1.1"), (0, "b")]
        );
    }

    #[test]
    fn walker_matches_recursive_traversal_on_generated_trees() {
        // Deterministic family of irregular trees.
        fn build(seed: u64, depth: usize, counter: &mut usize) -> Vec<OutlineNode> {
            let width = if depth > 3 { 0 } else { ((seed >> (depth * 3)) % 4) as usize };
            (0..width)
                .map(|i| {
                    *counter += 1;
                    let title = format!("n{counter}");
                    let children = build(seed.rotate_left(i as u32 + 7), depth + 1, counter);
                    node(&title, children)
                })
                .collect()
        }

        for seed in [1u64, 0x9e37_79b9, 0xdead_beef, 0x1234_5678_9abc, u64::MAX / 3] {
            let mut counter = 0;
            let roots = build(seed, 0, &mut counter);
            let entries = walk(&roots);
            assert_eq!(entries, OutlineNode::flatten(&roots, 0));
            let total: usize = roots.iter().map(OutlineNode::len).sum();
            assert_eq!(entries.len(), total);
        }
    }

    #[test]
    fn tree_cursor_primitives() {
        let roots = vec![node("a", vec![node("a.1", vec![])]), node("b", vec![])];
        let mut cursor = TreeCursor::new(&roots);
        assert_eq!(cursor.item().unwrap().unwrap().title, "a");
        assert_eq!(cursor.up().unwrap(), Move::Blocked);
        assert_eq!(cursor.down().unwrap(), Move::Moved);
        assert_eq!(cursor.depth(), 1);
        assert_eq!(cursor.item().unwrap().unwrap().title, "a.1");
        assert_eq!(cursor.down().unwrap(), Move::Blocked);
        assert_eq!(cursor.next().unwrap(), Move::Blocked);
        assert_eq!(cursor.up().unwrap(), Move::Moved);
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.next().unwrap(), Move::Moved);
        assert_eq!(cursor.item().unwrap().unwrap().title, "b");
        assert_eq!(cursor.next().unwrap(), Move::Blocked);
    }

    #[test]
    fn empty_cursor_has_invalid_item() {
        let mut cursor = TreeCursor::new(&[]);
        assert_eq!(cursor.item().unwrap(), None);
        assert_eq!(cursor.down().unwrap(), Move::Blocked);
        assert_eq!(cursor.next().unwrap(), Move::Blocked);
        assert_eq!(cursor.up().unwrap(), Move::Blocked);
    }

    #[test]
    fn move_codes() {
        assert_eq!(Move::Moved.code(), 0);
        assert_eq!(Move::Blocked.code(), -1);
    }

    struct FailingCursor {
        calls: usize,
    }

    impl OutlineCursor for FailingCursor {
        fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
            self.calls += 1;
            if self.calls > 1 {
                return Err(PdfError::iterator("broken node"));
            }
            Ok(Some(OutlineItem::new("first")))
        }
        fn down(&mut self) -> Result<Move, PdfError> {
            Ok(Move::Blocked)
        }
        fn next(&mut self) -> Result<Move, PdfError> {
            Ok(Move::Moved)
        }
        fn up(&mut self) -> Result<Move, PdfError> {
            Ok(Move::Blocked)
        }
        fn depth(&self) -> usize {
            0
        }
    }

    #[test]
    fn walker_surfaces_cursor_error_then_stops() {
        let mut walker = OutlineWalker::new(FailingCursor { calls: 0 });
        assert_eq!(walker.next().unwrap().unwrap().item.title, "first");
        let err = walker.next().unwrap().unwrap_err();
        assert!(matches!(err, PdfError::Iterator(_)));
        assert!(walker.next().is_none());
    }

    /// Tree cursor whose `next` fails once the given number of items have
    /// been read.
    struct BrokenSiblingLink<'a> {
        inner: TreeCursor<'a>,
        reads: usize,
        fail_after: usize,
    }

    impl OutlineCursor for BrokenSiblingLink<'_> {
        fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
            self.reads += 1;
            self.inner.item()
        }
        fn down(&mut self) -> Result<Move, PdfError> {
            self.inner.down()
        }
        fn next(&mut self) -> Result<Move, PdfError> {
            if self.reads >= self.fail_after {
                return Err(PdfError::iterator("sibling link is broken"));
            }
            self.inner.next()
        }
        fn up(&mut self) -> Result<Move, PdfError> {
            self.inner.up()
        }
        fn depth(&self) -> usize {
            self.inner.depth()
        }
    }

    #[test]
    fn item_is_yielded_before_failure_to_move_past_it() {
        let roots = vec![node("a", vec![]), node("b", vec![]), node("c", vec![])];
        let mut walker = OutlineWalker::new(BrokenSiblingLink {
            inner: TreeCursor::new(&roots),
            reads: 0,
            fail_after: 2,
        });
        assert_eq!(walker.next().unwrap().unwrap().item.title, "a");
        assert_eq!(walker.next().unwrap().unwrap().item.title, "b");
        let err = walker.next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "outline iterator error: sibling link is broken");
        assert!(walker.next().is_none());
    }

    #[test]
    fn last_item_is_yielded_even_if_climbing_fails() {
        struct UpFails<'a>(TreeCursor<'a>);

        impl OutlineCursor for UpFails<'_> {
            fn item(&mut self) -> Result<Option<OutlineItem>, PdfError> {
                self.0.item()
            }
            fn down(&mut self) -> Result<Move, PdfError> {
                self.0.down()
            }
            fn next(&mut self) -> Result<Move, PdfError> {
                self.0.next()
            }
            fn up(&mut self) -> Result<Move, PdfError> {
                Err(PdfError::iterator("parent link is broken"))
            }
            fn depth(&self) -> usize {
                self.0.depth()
            }
        }

        let roots = vec![node("a", vec![node("a.1", vec![])])];
        let mut walker = OutlineWalker::new(UpFails(TreeCursor::new(&roots)));
        assert_eq!(walker.next().unwrap().unwrap().depth, 0);
        let entry = walker.next().unwrap().unwrap();
        assert_eq!((entry.depth, entry.item.title.as_str()), (1, "a.1"));
        assert!(walker.next().unwrap().is_err());
        assert!(walker.next().is_none());
    }

    #[test]
    fn outline_item_builders() {
        let item = OutlineItem::new("Intro").with_uri("#page=1").open(true);
        assert_eq!(item.uri.as_deref(), Some("#page=1"));
        assert!(item.is_open);
    }
}
