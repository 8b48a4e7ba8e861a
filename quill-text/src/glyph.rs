//! Glyph records — one per (font, character), immutable once created.
//!
//! Coordinates are y-up with the origin on the baseline at the pen
//! position: a glyph's quad spans `[left, bottom]..[right, top]` where
//! `bottom = -baseline`.

use crate::atlas::AtlasRegion;

/// Index of an atlas in its owning glyph cache's atlas table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtlasId(pub u32);

impl AtlasId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Bitmap size and placement metrics reported by the rasterizer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Distance from the bottom of the bitmap up to the baseline.
    /// Positive for glyphs with descenders.
    pub baseline: i32,
    /// Offset from the pen position to the left edge of the bitmap.
    pub left_bearing: i32,
    /// Horizontal pen advance.
    pub advance: f32,
}

/// The renderable representation of one character in one font.
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    character: char,
    atlas: AtlasId,
    /// Texture coordinates for the corners bottom-left, bottom-right,
    /// top-right, top-left.
    tex_coords: [[f32; 2]; 4],
    metrics: GlyphMetrics,
    /// `[left, bottom, right, top]` relative to the pen position.
    vertices: [f32; 4],
}

impl Glyph {
    /// Build a glyph whose bitmap occupies `region` of atlas `atlas`.
    ///
    /// Atlas row 0 is the top of the surface, so the bottom of the quad
    /// samples `v_max`.
    pub fn new(character: char, atlas: AtlasId, region: AtlasRegion, metrics: GlyphMetrics) -> Self {
        let left = metrics.left_bearing as f32;
        let bottom = -metrics.baseline as f32;
        let vertices = [
            left,
            bottom,
            left + metrics.width as f32,
            bottom + metrics.height as f32,
        ];
        let tex_coords = [
            [region.u_min, region.v_max],
            [region.u_max, region.v_max],
            [region.u_max, region.v_min],
            [region.u_min, region.v_min],
        ];
        Self {
            character,
            atlas,
            tex_coords,
            metrics,
            vertices,
        }
    }

    pub fn character(&self) -> char {
        self.character
    }

    /// The atlas holding this glyph's pixels.
    pub fn atlas(&self) -> AtlasId {
        self.atlas
    }

    pub fn tex_coords(&self) -> &[[f32; 2]; 4] {
        &self.tex_coords
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }

    pub fn vertices(&self) -> &[f32; 4] {
        &self.vertices
    }

    pub fn advance(&self) -> f32 {
        self.metrics.advance
    }

    pub fn width(&self) -> u32 {
        self.metrics.width
    }

    pub fn height(&self) -> u32 {
        self.metrics.height
    }

    /// Kerning adjustment between this glyph and `right`. Always zero:
    /// kerning tables are not consulted.
    pub fn kerning(&self, _right: &Glyph) -> f32 {
        0.0
    }
}
