//! Glyph rasterization — the capability the glyph cache calls on a miss.
//!
//! [`Rasterizer`] is the seam between the cache and a font backend. The
//! cache is generic over it, so the backend is picked once when a font is
//! constructed. [`CosmicRasterizer`] is the production backend: it shapes a
//! single character with `cosmic-text` and renders it through `SwashCache`.
//!
//! ## Sessions
//!
//! Batch lookups bracket their misses with `begin_session` / `end_session`
//! so a backend can keep expensive per-call state (here, a shaping
//! `Buffer`) alive across several characters. A session is only opened
//! when a batch actually misses.

use std::sync::{Arc, Mutex, MutexGuard};

use cosmic_text::{
    Attrs, Buffer, Family, FontSystem, LayoutGlyph, Metrics, Shaping, Style as CStyle,
    SwashCache, SwashContent, Weight,
};

use crate::atlas::PixelFormat;
use crate::error::{Result, TextError};
use crate::font::FontDescriptor;
use crate::glyph::GlyphMetrics;

/// Line height used for the shaping buffer, relative to the font size.
const LINE_SPACING: f32 = 1.2;

/// Vertical font metrics in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FontMetrics {
    /// Height above the baseline (positive).
    pub ascent: f32,
    /// Depth below the baseline (negative).
    pub descent: f32,
}

impl FontMetrics {
    /// Baseline-to-baseline distance.
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent
    }
}

/// A rasterized glyph bitmap plus its placement metrics.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterizedGlyph {
    /// Row-major pixels, top row first.
    pub data: Vec<u8>,
    pub format: PixelFormat,
    pub metrics: GlyphMetrics,
}

impl RasterizedGlyph {
    /// A zero-sized glyph that only advances the pen.
    pub fn empty(advance: f32) -> Self {
        Self {
            data: Vec::new(),
            format: PixelFormat::Alpha,
            metrics: GlyphMetrics {
                advance,
                ..Default::default()
            },
        }
    }
}

/// Produces bitmaps and metrics for single characters of one font.
pub trait Rasterizer {
    /// Called before the first miss of a batch lookup.
    fn begin_session(&mut self) -> Result<()> {
        Ok(())
    }

    /// Render `character`. Fails if the font has no glyph for it.
    fn rasterize(&mut self, character: char) -> Result<RasterizedGlyph>;

    /// Called once when a batch that opened a session finishes, whether it
    /// succeeded or not.
    fn end_session(&mut self) {}

    /// Vertical metrics of the font.
    fn metrics(&mut self) -> Result<FontMetrics>;
}

/// A `FontSystem` shared between the fonts of one application.
pub type SharedFontSystem = Arc<Mutex<FontSystem>>;

/// Rasterizer backed by cosmic-text's shaper and swash renderer.
pub struct CosmicRasterizer {
    font_system: SharedFontSystem,
    swash_cache: SwashCache,
    descriptor: FontDescriptor,
    /// Shaping buffer, alive for the duration of a session.
    buffer: Option<Buffer>,
}

impl CosmicRasterizer {
    pub fn new(font_system: SharedFontSystem, descriptor: FontDescriptor) -> Self {
        Self {
            font_system,
            swash_cache: SwashCache::new(),
            descriptor,
            buffer: None,
        }
    }

    /// Convenience constructor with system font discovery.
    pub fn with_system_fonts(descriptor: FontDescriptor) -> Self {
        Self::new(Arc::new(Mutex::new(FontSystem::new())), descriptor)
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }

    fn buffer_metrics(&self) -> Metrics {
        Metrics::new(self.descriptor.size, self.descriptor.size * LINE_SPACING)
    }
}

impl Rasterizer for CosmicRasterizer {
    fn begin_session(&mut self) -> Result<()> {
        let metrics = self.buffer_metrics();
        let mut font_system = lock(&self.font_system)?;
        self.buffer = Some(Buffer::new(&mut font_system, metrics));
        Ok(())
    }

    fn rasterize(&mut self, character: char) -> Result<RasterizedGlyph> {
        // Newlines and other controls are never drawn.
        if character.is_control() {
            return Ok(RasterizedGlyph::empty(0.0));
        }

        let metrics = self.buffer_metrics();
        let mut font_system = lock(&self.font_system)?;
        let buffer = self
            .buffer
            .get_or_insert_with(|| Buffer::new(&mut font_system, metrics));

        let mut utf8 = [0u8; 4];
        let glyph = shape_first(
            buffer,
            &mut font_system,
            &self.descriptor,
            character.encode_utf8(&mut utf8),
        )
        .ok_or_else(|| TextError::rasterization(character, "shaping produced no glyph"))?;

        if glyph.glyph_id == 0 {
            return Err(TextError::rasterization(
                character,
                format!("no glyph in {:?}", self.descriptor.families),
            ));
        }

        let physical = glyph.physical((0.0, 0.0), 1.0);
        let image = self.swash_cache.get_image(&mut font_system, physical.cache_key);

        let rasterized = match image {
            Some(image) if image.placement.width > 0 && image.placement.height > 0 => {
                let format = match image.content {
                    SwashContent::Mask => PixelFormat::Alpha,
                    SwashContent::Color | SwashContent::SubpixelMask => PixelFormat::Rgba,
                };
                RasterizedGlyph {
                    data: image.data.clone(),
                    format,
                    metrics: GlyphMetrics {
                        width: image.placement.width,
                        height: image.placement.height,
                        baseline: image.placement.height as i32 - image.placement.top,
                        left_bearing: image.placement.left,
                        advance: glyph.w,
                    },
                }
            }
            // Whitespace.
            _ => RasterizedGlyph::empty(glyph.w),
        };

        log::trace!(
            "rasterized {character:?}: {}x{} advance {:.1}",
            rasterized.metrics.width,
            rasterized.metrics.height,
            rasterized.metrics.advance,
        );
        Ok(rasterized)
    }

    fn end_session(&mut self) {
        self.buffer = None;
    }

    fn metrics(&mut self) -> Result<FontMetrics> {
        let metrics = self.buffer_metrics();
        let mut font_system = lock(&self.font_system)?;
        let mut buffer = Buffer::new(&mut font_system, metrics);

        let glyph = shape_first(&mut buffer, &mut font_system, &self.descriptor, "x")
            .ok_or_else(|| TextError::rasterization('x', "shaping produced no glyph"))?;
        let font = font_system
            .get_font(glyph.font_id)
            .ok_or_else(|| TextError::rasterization('x', "shaped with an unloaded face"))?;

        let face = font.as_swash().metrics(&[]);
        let scale = self.descriptor.size / face.units_per_em as f32;
        Ok(FontMetrics {
            ascent: face.ascent * scale,
            descent: -face.descent * scale,
        })
    }
}

// ── cosmic-text helpers ─────────────────────────────────────────────

fn lock(font_system: &SharedFontSystem) -> Result<MutexGuard<'_, FontSystem>> {
    font_system
        .lock()
        .map_err(|_| TextError::FontSystem("lock poisoned by a panicking thread".into()))
}

/// Shape `text` and return its first laid-out glyph.
fn shape_first(
    buffer: &mut Buffer,
    font_system: &mut FontSystem,
    descriptor: &FontDescriptor,
    text: &str,
) -> Option<LayoutGlyph> {
    let family = resolve_family(font_system, descriptor);
    buffer.set_text(font_system, text, attrs(family, descriptor), Shaping::Advanced);
    buffer.shape_until_scroll(font_system, false);
    buffer
        .layout_runs()
        .flat_map(|run| run.glyphs.iter())
        .next()
        .cloned()
}

/// First family of the descriptor's fallback chain that the font database
/// can serve. Generic families always resolve; if nothing matches, the
/// primary family is used and cosmic-text picks its own fallback.
fn resolve_family<'a>(font_system: &FontSystem, descriptor: &'a FontDescriptor) -> &'a str {
    descriptor
        .families
        .iter()
        .map(String::as_str)
        .find(|name| {
            !matches!(family(name), Family::Name(_))
                || font_system.db().faces().any(|face| {
                    face.families
                        .iter()
                        .any(|(installed, _)| installed.eq_ignore_ascii_case(name))
                })
        })
        .unwrap_or_else(|| descriptor.primary_family())
}

fn attrs<'a>(family_name: &'a str, descriptor: &FontDescriptor) -> Attrs<'a> {
    let weight = if descriptor.bold {
        Weight::BOLD
    } else {
        Weight::NORMAL
    };
    let style = if descriptor.italic {
        CStyle::Italic
    } else {
        CStyle::Normal
    };
    Attrs::new()
        .family(family(family_name))
        .weight(weight)
        .style(style)
}

fn family(name: &str) -> Family<'_> {
    match name {
        "sans-serif" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        concrete => Family::Name(concrete),
    }
}

// ===================================================================
// Tests
// ===================================================================
