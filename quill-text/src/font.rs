//! Fonts — a descriptor, vertical metrics and the glyph cache they own.
//!
//! Each [`Font`] exclusively owns its [`GlyphCache`] and, through it, its
//! atlases. Sharing fonts between widgets goes through an explicit
//! [`FontLibrary`] the application creates and passes around; there is no
//! process-wide font table.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::cache::{GlyphCache, GlyphCacheConfig};
use crate::error::Result;
use crate::glyph::Glyph;
use crate::linebreak;
use crate::raster::{FontMetrics, Rasterizer};
use crate::shaped::ShapedString;

// ── Font descriptor ─────────────────────────────────────────────────

/// Which font to load: a family fallback chain, a pixel size and a style.
#[derive(Clone, Debug)]
pub struct FontDescriptor {
    /// Ordered list of lowercase family names, e.g. `["arial", "sans-serif"]`.
    pub families: Vec<String>,
    /// Size in pixels.
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl FontDescriptor {
    /// Descriptor for a CSS-like family string such as
    /// `"Arial, Helvetica, sans-serif"`.
    pub fn new(family: &str, size: f32) -> Self {
        let families: Vec<String> = family
            .split(',')
            .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            families: if families.is_empty() {
                vec!["sans-serif".into()]
            } else {
                families
            },
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    /// First family of the fallback chain.
    pub fn primary_family(&self) -> &str {
        self.families.first().map_or("sans-serif", String::as_str)
    }
}

impl PartialEq for FontDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.families == other.families
            && self.size.to_bits() == other.size.to_bits()
            && self.bold == other.bold
            && self.italic == other.italic
    }
}

impl Eq for FontDescriptor {}

impl Hash for FontDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.families.hash(state);
        self.size.to_bits().hash(state);
        self.bold.hash(state);
        self.italic.hash(state);
    }
}

// ── Font ────────────────────────────────────────────────────────────

/// A loaded font: descriptor, metrics and its glyph cache.
pub struct Font<R: Rasterizer> {
    descriptor: FontDescriptor,
    metrics: FontMetrics,
    cache: GlyphCache<R>,
}

impl<R: Rasterizer> Font<R> {
    /// Build a font around `rasterizer`. Queries the vertical metrics once.
    pub fn new(descriptor: FontDescriptor, mut rasterizer: R, config: GlyphCacheConfig) -> Result<Self> {
        let metrics = rasterizer.metrics()?;
        log::debug!(
            "loaded font {:?} {}px (ascent {:.1}, descent {:.1})",
            descriptor.families,
            descriptor.size,
            metrics.ascent,
            metrics.descent,
        );
        Ok(Self {
            descriptor,
            metrics,
            cache: GlyphCache::new(rasterizer, config),
        })
    }

    pub fn descriptor(&self) -> &FontDescriptor {
        &self.descriptor
    }

    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub fn ascent(&self) -> f32 {
        self.metrics.ascent
    }

    pub fn descent(&self) -> f32 {
        self.metrics.descent
    }

    pub fn line_height(&self) -> f32 {
        self.metrics.line_height()
    }

    pub fn cache(&self) -> &GlyphCache<R> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut GlyphCache<R> {
        &mut self.cache
    }

    pub fn get_glyph(&mut self, character: char) -> Result<Arc<Glyph>> {
        self.cache.get(character)
    }

    pub fn get_glyphs(&mut self, text: &str) -> Result<Vec<Arc<Glyph>>> {
        self.cache.get_many(text)
    }

    /// Glyphs of the first line of `text` wrapped at `width`.
    /// See [`linebreak::glyphs_for_width`].
    pub fn glyphs_for_width(&mut self, text: &str, width: f32) -> Result<Vec<Arc<Glyph>>> {
        linebreak::glyphs_for_width(&mut self.cache, text, width)
    }

    /// Shape `text` on a single line with its pen starting at `(x, y)`.
    pub fn shape(&mut self, text: &str, x: f32, y: f32) -> Result<ShapedString> {
        let glyphs = self.get_glyphs(text)?;
        Ok(ShapedString::build(&glyphs, x, y))
    }

    /// Wrap `text` into lines no wider than `width` where possible.
    ///
    /// The first baseline sits at `y`; each following line is one
    /// `line_height` lower (y grows upward). Newlines are consumed, not
    /// shaped.
    pub fn wrap(&mut self, text: &str, width: f32, x: f32, y: f32) -> Result<Vec<ShapedString>> {
        let mut lines = Vec::new();
        let mut rest = text;
        let mut baseline = y;

        while !rest.is_empty() {
            let glyphs = self.glyphs_for_width(rest, width)?;
            let consumed: usize = rest.chars().take(glyphs.len()).map(char::len_utf8).sum();
            rest = &rest[consumed..];
            rest = rest.strip_prefix('\n').unwrap_or(rest);

            lines.push(ShapedString::build(&glyphs, x, baseline));
            baseline -= self.line_height();
        }
        Ok(lines)
    }
}

// ── Font library ────────────────────────────────────────────────────

/// Bounded descriptor → font cache, shared explicitly by its owner.
///
/// Least recently used fonts are dropped once `capacity` is exceeded,
/// together with their atlases; strings shaped from an evicted font must
/// be rebuilt.
pub struct FontLibrary<R: Rasterizer> {
    fonts: LruCache<FontDescriptor, Font<R>>,
    config: GlyphCacheConfig,
}

impl<R: Rasterizer> FontLibrary<R> {
    /// A library holding at most `capacity` fonts (at least one).
    pub fn new(capacity: usize, config: GlyphCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            fonts: LruCache::new(capacity),
            config,
        }
    }

    /// The font for `descriptor`, creating it with `make_rasterizer` if it
    /// is not loaded yet.
    pub fn load<F>(&mut self, descriptor: &FontDescriptor, make_rasterizer: F) -> Result<&mut Font<R>>
    where
        F: FnOnce(&FontDescriptor) -> Result<R>,
    {
        let full = self.fonts.len() == self.fonts.cap().get();
        let evicted = if full && !self.fonts.contains(descriptor) {
            self.fonts.peek_lru().map(|(lru, _)| lru.clone())
        } else {
            None
        };

        let config = &self.config;
        self.fonts.try_get_or_insert_mut(descriptor.clone(), || {
            let rasterizer = make_rasterizer(descriptor)?;
            let font = Font::new(descriptor.clone(), rasterizer, config.clone())?;
            if let Some(evicted) = evicted {
                log::debug!("font library evicted {:?} {}px", evicted.families, evicted.size);
            }
            Ok(font)
        })
    }

    /// A loaded font, without creating it.
    pub fn get(&mut self, descriptor: &FontDescriptor) -> Option<&mut Font<R>> {
        self.fonts.get_mut(descriptor)
    }

    pub fn contains(&self, descriptor: &FontDescriptor) -> bool {
        self.fonts.contains(descriptor)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

// ===================================================================
// Tests
// ===================================================================
