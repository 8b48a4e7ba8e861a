//! Error taxonomy for the text engine.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextError {
    /// The rasterizer could not produce a glyph for `character`.
    #[error("Could not rasterize {character:?}: {reason}")]
    Rasterization { character: char, reason: String },

    /// A bitmap too large for any atlas the cache is allowed to create.
    #[error("Glyph bitmap {width}x{height} exceeds the maximum atlas size {max}")]
    AtlasOverflow { width: u32, height: u32, max: u32 },

    /// The shared font system cannot be used, e.g. its lock is poisoned.
    #[error("Font system unavailable: {0}")]
    FontSystem(String),

    /// `subwidth` / `draw` called with inverted or out-of-bounds indices.
    #[error("Glyph range {from}..{to} is invalid for a string of {len} glyphs")]
    Range { from: usize, to: usize, len: usize },
}

impl TextError {
    pub fn rasterization(character: char, reason: impl Into<String>) -> Self {
        Self::Rasterization {
            character,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TextError>;
