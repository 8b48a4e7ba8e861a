//! Shaped strings — immutable, pre-measured runs of glyphs.
//!
//! A [`ShapedString`] is built once from a glyph sequence and then answers
//! width, breakpoint and hit-test queries from its cumulative-advance
//! array without touching the glyphs again. Its vertex data is laid out
//! for direct upload (`T2F_V3F`, four vertices per glyph) and grouped into
//! [`DrawSpan`]s so the renderer binds each atlas texture once per run of
//! glyphs that share it.
//!
//! ```text
//!  glyphs:     h  e  l  l  o  ·  w
//!  atlas:      0  0  0  0  1  1  0
//!  spans:     [0..4 @0]  [4..6 @1] [6..7 @0]
//!  cumulative: 7 14 18 22 29 33 44
//! ```

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::{Result, TextError};
use crate::glyph::{AtlasId, Glyph};
use crate::linebreak::is_breakpoint;

/// One corner of a glyph quad.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphVertex {
    pub tex_coords: [f32; 2],
    pub position: [f32; 3],
}

/// A run of consecutive glyphs drawn from the same atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawSpan {
    /// Index of the first glyph.
    pub start: usize,
    /// Number of glyphs.
    pub len: usize,
    pub atlas: AtlasId,
}

impl DrawSpan {
    /// One past the last glyph.
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// A clipped span handed to the renderer.
#[derive(Clone, Copy, Debug)]
pub struct DrawBatch<'a> {
    /// Texture to bind.
    pub atlas: AtlasId,
    /// Index of the first glyph in `vertices`.
    pub start: usize,
    /// Four vertices per glyph.
    pub vertices: &'a [GlyphVertex],
    /// Horizontal translation to apply before drawing, so that the first
    /// drawn glyph of a suffix lands on the string's origin.
    pub x_offset: f32,
}

impl DrawBatch<'_> {
    pub fn glyph_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// Receives draw batches in span order; binds the atlas texture and draws.
pub trait GlyphRenderer {
    fn draw_batch(&mut self, batch: DrawBatch<'_>);
}

/// An immutable string of glyphs that can be measured and drawn quickly.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapedString {
    text: String,
    characters: Vec<char>,
    vertices: Vec<GlyphVertex>,
    /// `cumulative[i]` = advance from the origin through glyph `i`.
    cumulative: Vec<f32>,
    spans: Vec<DrawSpan>,
    width: f32,
}

impl ShapedString {
    /// Lay out `glyphs` left to right from the pen position
    /// `(origin_x, origin_y)` on the baseline.
    pub fn build(glyphs: &[Arc<Glyph>], origin_x: f32, origin_y: f32) -> Self {
        let mut characters = Vec::with_capacity(glyphs.len());
        let mut vertices = Vec::with_capacity(glyphs.len() * 4);
        let mut cumulative = Vec::with_capacity(glyphs.len());
        let mut spans: Vec<DrawSpan> = Vec::new();
        let mut advance = 0.0f32;

        for (index, glyph) in glyphs.iter().enumerate() {
            let x = origin_x + advance;
            let [left, bottom, right, top] = *glyph.vertices();
            let corners = [(left, bottom), (right, bottom), (right, top), (left, top)];
            for (tex_coords, (dx, dy)) in glyph.tex_coords().iter().zip(corners) {
                vertices.push(GlyphVertex {
                    tex_coords: *tex_coords,
                    position: [x + dx, origin_y + dy, 0.0],
                });
            }

            advance += glyph.advance();
            cumulative.push(advance);
            characters.push(glyph.character());

            match spans.last_mut() {
                Some(span) if span.atlas == glyph.atlas() => span.len += 1,
                _ => spans.push(DrawSpan {
                    start: index,
                    len: 1,
                    atlas: glyph.atlas(),
                }),
            }
        }

        Self {
            text: characters.iter().collect(),
            characters,
            vertices,
            cumulative,
            spans,
            width: advance,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of glyphs.
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Total advance width.
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn cumulative_advance(&self) -> &[f32] {
        &self.cumulative
    }

    pub fn spans(&self) -> &[DrawSpan] {
        &self.spans
    }

    pub fn vertices(&self) -> &[GlyphVertex] {
        &self.vertices
    }

    /// Vertex data as raw bytes for buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Width of the glyphs in `from..to`.
    pub fn subwidth(&self, from: usize, to: usize) -> Result<f32> {
        self.check_range(from, to)?;
        Ok(self.advance_to(to) - self.advance_to(from))
    }

    /// Index just past the last breakpoint after `from` such that the
    /// glyphs `from..index` fit in `width`.
    ///
    /// A newline breaks right after itself; the end of the string counts
    /// as a breakpoint. Returns `from` if nothing fits up to a breakpoint.
    pub fn break_index(&self, from: usize, width: f32) -> usize {
        if from >= self.len() {
            return from;
        }

        let limit = width + self.advance_to(from);
        let mut to = from;
        for (offset, (&character, &edge)) in self.characters[from..]
            .iter()
            .zip(&self.cumulative[from..])
            .enumerate()
        {
            let index = from + offset;
            if edge > limit {
                return to;
            }
            if character == '\n' {
                return index + 1;
            }
            if is_breakpoint(character) {
                to = index + 1;
            }
        }
        self.len()
    }

    /// Glyph boundary nearest to `x`, measured from the origin. Used to
    /// place a caret from a pointer position.
    pub fn index_at(&self, x: f32) -> usize {
        if x <= 0.0 {
            return 0;
        }
        let index = self.cumulative.partition_point(|&edge| edge < x);
        if index == self.len() {
            return index;
        }
        let left = self.advance_to(index);
        let right = self.cumulative[index];
        if x - left < right - x {
            index
        } else {
            index + 1
        }
    }

    /// Draw glyphs `from..to`, one batch per span they intersect.
    ///
    /// Nothing is emitted for an empty range or an empty string.
    pub fn draw<D: GlyphRenderer>(&self, from: usize, to: usize, renderer: &mut D) -> Result<()> {
        self.check_range(from, to)?;
        if from == to {
            return Ok(());
        }

        let x_offset = -self.advance_to(from);
        for span in &self.spans {
            if span.start >= to {
                break;
            }
            let start = span.start.max(from);
            let end = span.end().min(to);
            if start >= end {
                continue;
            }
            renderer.draw_batch(DrawBatch {
                atlas: span.atlas,
                start,
                vertices: &self.vertices[start * 4..end * 4],
                x_offset,
            });
        }
        Ok(())
    }

    /// Draw the whole string.
    pub fn draw_all<D: GlyphRenderer>(&self, renderer: &mut D) -> Result<()> {
        self.draw(0, self.len(), renderer)
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    /// Advance from the origin to the start of glyph `index`.
    fn advance_to(&self, index: usize) -> f32 {
        match index {
            0 => 0.0,
            i => self.cumulative[i - 1],
        }
    }

    fn check_range(&self, from: usize, to: usize) -> Result<()> {
        if from > to || to > self.len() {
            return Err(TextError::Range {
                from,
                to,
                len: self.len(),
            });
        }
        Ok(())
    }
}

// ===================================================================
// Tests
// ===================================================================
