//! Deterministic rasterizer for unit tests.

use std::collections::{HashMap, HashSet};

use crate::atlas::PixelFormat;
use crate::error::{Result, TextError};
use crate::glyph::GlyphMetrics;
use crate::raster::{FontMetrics, RasterizedGlyph, Rasterizer};

/// Renders every character as a solid box. Sizes, advances and pixels can be
/// overridden per character, and characters can be marked missing.
pub(crate) struct BoxRasterizer {
    width: u32,
    height: u32,
    advance: f32,
    overrides: HashMap<char, (u32, u32, f32)>,
    pixels: HashMap<char, Vec<u8>>,
    missing: HashSet<char>,
    pub sessions_begun: usize,
    pub sessions_ended: usize,
    pub rasterized: Vec<char>,
}

impl BoxRasterizer {
    pub fn new(width: u32, height: u32, advance: f32) -> Self {
        Self {
            width,
            height,
            advance,
            overrides: HashMap::new(),
            pixels: HashMap::new(),
            missing: HashSet::new(),
            sessions_begun: 0,
            sessions_ended: 0,
            rasterized: Vec::new(),
        }
    }

    pub fn with_glyph(mut self, character: char, width: u32, height: u32, advance: f32) -> Self {
        self.overrides.insert(character, (width, height, advance));
        self
    }

    /// Report `data` as the bitmap of `character` regardless of its size.
    pub fn with_pixels(mut self, character: char, data: Vec<u8>) -> Self {
        self.pixels.insert(character, data);
        self
    }

    pub fn without(mut self, character: char) -> Self {
        self.missing.insert(character);
        self
    }
}

impl Rasterizer for BoxRasterizer {
    fn begin_session(&mut self) -> Result<()> {
        self.sessions_begun += 1;
        Ok(())
    }

    fn rasterize(&mut self, character: char) -> Result<RasterizedGlyph> {
        if self.missing.contains(&character) {
            return Err(TextError::rasterization(character, "not in test font"));
        }
        self.rasterized.push(character);

        let (width, height, advance) = self
            .overrides
            .get(&character)
            .copied()
            .unwrap_or((self.width, self.height, self.advance));
        let data = match self.pixels.get(&character) {
            Some(data) => data.clone(),
            None => vec![character as u8; width as usize * height as usize],
        };
        Ok(RasterizedGlyph {
            data,
            format: PixelFormat::Alpha,
            metrics: GlyphMetrics {
                width,
                height,
                baseline: 0,
                left_bearing: 0,
                advance,
            },
        })
    }

    fn end_session(&mut self) {
        self.sessions_ended += 1;
    }

    fn metrics(&mut self) -> Result<FontMetrics> {
        Ok(FontMetrics {
            ascent: self.height as f32,
            descent: -(self.height as f32) / 4.0,
        })
    }
}
