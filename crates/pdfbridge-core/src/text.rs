//! Structured page text and search.
//!
//! A [`StextPage`] holds the characters shown on a page grouped into
//! blocks and lines, each character with its origin and glyph [`Quad`].
//! The engine places characters; [`StextBuilder`] groups them by
//! position, and [`search_stext`] finds literal, case-insensitive matches.

use crate::geometry::{Point, Rect};

/// Four corners of a glyph box. Rotated or skewed text gives a quad that
/// is not axis-aligned.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quad {
    pub ul: Point,
    pub ur: Point,
    pub ll: Point,
    pub lr: Point,
}

impl Quad {
    pub fn from_rect(r: &Rect) -> Self {
        Self {
            ul: Point::new(r.x0, r.y1),
            ur: Point::new(r.x1, r.y1),
            ll: Point::new(r.x0, r.y0),
            lr: Point::new(r.x1, r.y0),
        }
    }

    /// Bounding rectangle of the four corners.
    pub fn bounds(&self) -> Rect {
        let xs = [self.ul.x, self.ur.x, self.ll.x, self.lr.x];
        let ys = [self.ul.y, self.ur.y, self.ll.y, self.lr.y];
        Rect::new(
            xs.iter().copied().fold(f64::INFINITY, f64::min),
            ys.iter().copied().fold(f64::INFINITY, f64::min),
            xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )
    }
}

/// One character shown on a page.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextChar {
    pub c: char,
    /// Pen position on the baseline, in page space.
    pub origin: Point,
    pub quad: Quad,
    /// Font size scaled by the text and graphics transforms.
    pub size: f64,
    /// Base font name, subset prefix removed.
    pub font: String,
}

/// Characters sharing a baseline, in reading order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextLine {
    /// Unit vector of the writing direction.
    pub dir: Point,
    pub chars: Vec<TextChar>,
}

impl TextLine {
    pub fn bbox(&self) -> Rect {
        union_all(self.chars.iter().map(|c| c.quad.bounds()))
    }

    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.c).collect()
    }
}

/// Consecutive lines set close together.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn bbox(&self) -> Rect {
        union_all(self.lines.iter().map(TextLine::bbox))
    }

    /// Line texts joined by `\n`.
    pub fn text(&self) -> String {
        let lines: Vec<String> = self.lines.iter().map(TextLine::text).collect();
        lines.join("\n")
    }
}

/// The text of one page.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StextPage {
    pub bound: Rect,
    pub blocks: Vec<TextBlock>,
}

impl StextPage {
    /// Every character, block by block and line by line.
    pub fn chars(&self) -> impl Iterator<Item = &TextChar> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .flat_map(|l| l.chars.iter())
    }

    /// Block texts separated by a blank line.
    pub fn text(&self) -> String {
        let blocks: Vec<String> = self.blocks.iter().map(TextBlock::text).collect();
        blocks.join("\n\n")
    }
}

fn union_all(rects: impl Iterator<Item = Rect>) -> Rect {
    rects.reduce(|a, b| a.union(&b)).unwrap_or_default()
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

fn sub(a: Point, b: Point) -> Point {
    Point::new(a.x - b.x, a.y - b.y)
}

/// Groups placed characters into lines and blocks.
///
/// A character continues the current line when it sits on the same
/// baseline (within half its size) and does not move back by more than
/// half its size. A horizontal gap wider than [`StextBuilder::SPACE_GAP`]
/// of the font size between two visible characters gets a space. A new
/// line more than [`StextBuilder::BLOCK_GAP`] line heights below the
/// previous one starts a new block.
#[derive(Debug)]
pub struct StextBuilder {
    page: StextPage,
    block: Vec<TextLine>,
    line: Option<TextLine>,
}

impl StextBuilder {
    pub const SPACE_GAP: f64 = 0.25;
    pub const BLOCK_GAP: f64 = 1.5;

    pub fn new(bound: Rect) -> Self {
        Self {
            page: StextPage {
                bound,
                blocks: Vec::new(),
            },
            block: Vec::new(),
            line: None,
        }
    }

    /// Add a character written in direction `dir` (a unit vector).
    pub fn push(&mut self, ch: TextChar, dir: Point) {
        if let Some(line) = self.line.as_mut() {
            if let Some(last) = line.chars.last() {
                let same_dir = dot(line.dir, dir) > 0.99;
                let offset = sub(ch.origin, last.origin);
                let along = dot(offset, line.dir);
                let across = offset.x * line.dir.y - offset.y * line.dir.x;
                let tolerance = ch.size.max(last.size) * 0.5;
                if same_dir && across.abs() <= tolerance && along >= -tolerance {
                    let advance = dot(sub(last.quad.lr, last.quad.ll), line.dir);
                    let gap = along - advance;
                    if gap > ch.size * Self::SPACE_GAP
                        && !ch.c.is_whitespace()
                        && !last.c.is_whitespace()
                    {
                        let space = TextChar {
                            c: ' ',
                            origin: Point::new(
                                last.origin.x + line.dir.x * advance,
                                last.origin.y + line.dir.y * advance,
                            ),
                            quad: Quad {
                                ul: last.quad.ur,
                                ur: ch.quad.ul,
                                ll: last.quad.lr,
                                lr: ch.quad.ll,
                            },
                            size: ch.size,
                            font: ch.font.clone(),
                        };
                        line.chars.push(space);
                    }
                    line.chars.push(ch);
                    return;
                }
            }
        }
        self.finish_line(&ch);
        self.line = Some(TextLine {
            dir,
            chars: vec![ch],
        });
    }

    fn finish_line(&mut self, next: &TextChar) {
        let Some(line) = self.line.take() else {
            return;
        };
        let new_block = line.chars.last().is_some_and(|last| {
            let offset = sub(next.origin, last.origin);
            let below = offset.x * line.dir.y - offset.y * line.dir.x;
            below > last.size.max(next.size) * Self::BLOCK_GAP
                || below < -last.size.max(next.size) * 0.5
        });
        self.block.push(line);
        if new_block {
            self.finish_block();
        }
    }

    fn finish_block(&mut self) {
        if !self.block.is_empty() {
            self.page.blocks.push(TextBlock {
                lines: std::mem::take(&mut self.block),
            });
        }
    }

    pub fn finish(mut self) -> StextPage {
        if let Some(line) = self.line.take() {
            self.block.push(line);
        }
        self.finish_block();
        self.page
    }
}

/// One quad of a search hit.
///
/// A hit that spans lines yields one quad per line; `mark` is the 0-based
/// number of the hit the quad belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchHit {
    pub mark: usize,
    pub quad: Quad,
}

struct Slot {
    c: char,
    // (line number, glyph quad); None for line breaks.
    glyph: Option<(usize, Quad)>,
}

/// Find `needle` in the page text, returning at most `max_hits` quads.
///
/// Matching ignores case, and any run of whitespace in `needle` matches
/// any run of whitespace or line breaks on the page. Hits do not overlap.
/// An empty or all-whitespace needle finds nothing.
pub fn search_stext(page: &StextPage, needle: &str, max_hits: usize) -> Vec<SearchHit> {
    let needle: Vec<char> = needle.trim().chars().collect();
    if needle.is_empty() || max_hits == 0 {
        return Vec::new();
    }

    let mut hay = Vec::new();
    let mut line_no = 0;
    for line in page.blocks.iter().flat_map(|b| b.lines.iter()) {
        for ch in &line.chars {
            hay.push(Slot {
                c: ch.c,
                glyph: Some((line_no, ch.quad)),
            });
        }
        hay.push(Slot {
            c: '\n',
            glyph: None,
        });
        line_no += 1;
    }

    let mut hits = Vec::new();
    let mut mark = 0;
    let mut start = 0;
    while start < hay.len() {
        let Some(end) = match_at(&hay, start, &needle) else {
            start += 1;
            continue;
        };
        for quad in line_quads(&hay[start..end]) {
            if hits.len() == max_hits {
                return hits;
            }
            hits.push(SearchHit { mark, quad });
        }
        mark += 1;
        start = end;
    }
    hits
}

/// End of the match of `needle` starting at `start`, if any.
fn match_at(hay: &[Slot], start: usize, needle: &[char]) -> Option<usize> {
    let mut i = start;
    let mut n = 0;
    while n < needle.len() {
        if needle[n].is_whitespace() {
            while n < needle.len() && needle[n].is_whitespace() {
                n += 1;
            }
            if !hay.get(i).is_some_and(|s| s.c.is_whitespace()) {
                return None;
            }
            while hay.get(i).is_some_and(|s| s.c.is_whitespace()) {
                i += 1;
            }
        } else {
            let slot = hay.get(i)?;
            if !same_letter(slot.c, needle[n]) {
                return None;
            }
            i += 1;
            n += 1;
        }
    }
    Some(i)
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// One quad per line covered by `slots`, from the first glyph's left edge
/// to the last glyph's right edge.
fn line_quads(slots: &[Slot]) -> Vec<Quad> {
    let mut quads: Vec<(usize, Quad)> = Vec::new();
    for (line, quad) in slots.iter().filter_map(|s| s.glyph) {
        match quads.last_mut() {
            Some((current, q)) if *current == line => {
                q.ur = quad.ur;
                q.lr = quad.lr;
            }
            _ => quads.push((line, quad)),
        }
    }
    quads.into_iter().map(|(_, q)| q).collect()
}
