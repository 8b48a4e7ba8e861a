//! Greedy line breaking against a width budget.
//!
//! [`glyphs_for_width`] returns the longest prefix of a text that fits a
//! width, cut after a space or zero-width space. A newline always ends the
//! line and is never part of it. When no break opportunity falls inside the
//! budget the line runs on to the first one (or the end of the text), so
//! every call on non-empty text yields at least one glyph unless the text
//! starts with a newline.

use std::sync::Arc;

use crate::cache::GlyphCache;
use crate::error::Result;
use crate::glyph::Glyph;
use crate::raster::Rasterizer;

/// Space or zero-width space.
pub fn is_breakpoint(character: char) -> bool {
    matches!(character, ' ' | '\u{200b}')
}

/// Glyphs seen since the last breakpoint are held back until the next
/// breakpoint proves they belong on this line.
struct BreakState {
    committed: Vec<Arc<Glyph>>,
    pending: Vec<Arc<Glyph>>,
    remaining: f32,
}

impl BreakState {
    fn new(width: f32) -> Self {
        Self {
            committed: Vec::new(),
            pending: Vec::new(),
            remaining: width,
        }
    }

    fn commit(&mut self) {
        self.committed.append(&mut self.pending);
    }

    fn finish(self) -> Vec<Arc<Glyph>> {
        if self.committed.is_empty() {
            self.pending
        } else {
            self.committed
        }
    }
}

/// Glyphs for the first line of `text` when wrapped at `width`.
///
/// Running out of width stops the line only once something is committed;
/// a line that already fits exactly (remaining width zero) also stops
/// there. Glyphs looked up for a word that ends up discarded stay in the
/// cache.
pub fn glyphs_for_width<R: Rasterizer>(
    cache: &mut GlyphCache<R>,
    text: &str,
    width: f32,
) -> Result<Vec<Arc<Glyph>>> {
    let mut batch = cache.batch();
    let mut state = BreakState::new(width);

    for character in text.chars() {
        if character == '\n' {
            state.commit();
            return Ok(state.finish());
        }

        let glyph = batch.get(character)?;
        state.remaining -= glyph.advance();
        state.pending.push(glyph);

        if state.remaining <= 0.0 && !state.committed.is_empty() {
            return Ok(state.committed);
        }

        if is_breakpoint(character) {
            state.commit();
        }
    }

    state.commit();
    Ok(state.finish())
}

// ===================================================================
// Tests
// ===================================================================
