//! Glyph cache — one per font.
//!
//! Maps characters to [`Glyph`]s, rasterizing and packing on first use.
//! Atlases live in a table indexed by [`AtlasId`]; lookups try the newest
//! atlas first since it is the one most likely to have room. When no atlas
//! accepts a bitmap a new one is appended, sized up for oversized glyphs.
//!
//! Glyphs are never evicted or recreated, so an `Arc<Glyph>` handed out
//! once stays valid and identical for the lifetime of the cache.

use std::collections::HashMap;
use std::sync::Arc;

use crate::atlas::{AtlasAllocator, AtlasRegion, PixelFormat};
use crate::error::{Result, TextError};
use crate::glyph::{AtlasId, Glyph};
use crate::raster::{RasterizedGlyph, Rasterizer};

/// Atlas sizing for a glyph cache.
#[derive(Clone, Debug)]
pub struct GlyphCacheConfig {
    /// Width of newly created atlases, in pixels.
    pub atlas_width: u32,
    /// Height of newly created atlases, in pixels.
    pub atlas_height: u32,
    /// Largest atlas dimension the cache may create.
    pub max_atlas_size: u32,
    /// Pixel format of every atlas surface.
    pub format: PixelFormat,
}

impl Default for GlyphCacheConfig {
    fn default() -> Self {
        Self {
            atlas_width: 256,
            atlas_height: 256,
            max_atlas_size: 4096,
            format: PixelFormat::Alpha,
        }
    }
}

/// Counters for debugging/monitoring.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Rasterizer sessions opened by batch lookups.
    pub sessions: u64,
}

/// Per-font character → glyph cache.
pub struct GlyphCache<R: Rasterizer> {
    rasterizer: R,
    config: GlyphCacheConfig,
    /// Indexed by `AtlasId`; the newest atlas is last.
    atlases: Vec<AtlasAllocator>,
    glyphs: HashMap<char, Arc<Glyph>>,
    /// Size of the next atlas; grows when an oversized glyph arrives.
    default_size: (u32, u32),
    stats: GlyphCacheStats,
}

impl<R: Rasterizer> GlyphCache<R> {
    pub fn new(rasterizer: R, config: GlyphCacheConfig) -> Self {
        let default_size = (
            config.atlas_width.min(config.max_atlas_size),
            config.atlas_height.min(config.max_atlas_size),
        );
        Self {
            rasterizer,
            config,
            atlases: Vec::new(),
            glyphs: HashMap::new(),
            default_size,
            stats: GlyphCacheStats::default(),
        }
    }

    /// Glyph for `character`, rasterizing and packing it on first use.
    pub fn get(&mut self, character: char) -> Result<Arc<Glyph>> {
        self.batch().get(character)
    }

    /// Glyphs for every character of `text`, in order. All misses share
    /// one rasterizer session.
    pub fn get_many(&mut self, text: &str) -> Result<Vec<Arc<Glyph>>> {
        let mut batch = self.batch();
        let glyphs = text.chars().map(|c| batch.get(c)).collect();
        glyphs
    }

    /// Start a batch of lookups sharing one lazily-opened rasterizer session.
    pub fn batch(&mut self) -> GlyphBatch<'_, R> {
        GlyphBatch {
            cache: self,
            session_open: false,
        }
    }

    pub fn contains(&self, character: char) -> bool {
        self.glyphs.contains_key(&character)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn atlas(&self, id: AtlasId) -> Option<&AtlasAllocator> {
        self.atlases.get(id.index())
    }

    /// All atlases, indexed by `AtlasId`.
    pub fn atlases(&self) -> &[AtlasAllocator] {
        &self.atlases
    }

    pub fn atlas_count(&self) -> usize {
        self.atlases.len()
    }

    /// Ids of atlases whose pixels changed since the last call. Resets
    /// their dirty flags; the caller is expected to upload each one.
    pub fn take_dirty_atlases(&mut self) -> Vec<AtlasId> {
        self.atlases
            .iter_mut()
            .enumerate()
            .filter_map(|(index, atlas)| atlas.take_dirty().then_some(AtlasId(index as u32)))
            .collect()
    }

    /// Size the next atlas will be created with.
    pub fn default_atlas_size(&self) -> (u32, u32) {
        self.default_size
    }

    pub fn config(&self) -> &GlyphCacheConfig {
        &self.config
    }

    pub fn stats(&self) -> &GlyphCacheStats {
        &self.stats
    }

    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    pub fn rasterizer_mut(&mut self) -> &mut R {
        &mut self.rasterizer
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    /// Place a fresh bitmap and record its glyph.
    fn insert(&mut self, character: char, bitmap: RasterizedGlyph) -> Result<Arc<Glyph>> {
        let metrics = bitmap.metrics;
        let max = self.config.max_atlas_size;
        if metrics.width > max || metrics.height > max {
            log::warn!(
                "glyph {character:?} bitmap {}x{} exceeds max atlas size {max}",
                metrics.width,
                metrics.height,
            );
            return Err(TextError::AtlasOverflow {
                width: metrics.width,
                height: metrics.height,
                max,
            });
        }
        let expected = AtlasAllocator::bitmap_len(metrics.width, metrics.height, bitmap.format);
        if expected != Some(bitmap.data.len()) {
            return Err(TextError::rasterization(
                character,
                format!(
                    "{}x{} {:?} bitmap has {} bytes, expected {}",
                    metrics.width,
                    metrics.height,
                    bitmap.format,
                    bitmap.data.len(),
                    expected.unwrap_or(usize::MAX),
                ),
            ));
        }

        let placed = self
            .atlases
            .iter_mut()
            .enumerate()
            .rev()
            .find_map(|(index, atlas)| {
                atlas
                    .place(metrics.width, metrics.height, &bitmap.data, bitmap.format)
                    .map(|rect| (index, atlas.tex_coords(&rect)))
            });

        let (index, region) = match placed {
            Some(placed) => placed,
            None => self.grow(&bitmap)?,
        };

        let glyph = Arc::new(Glyph::new(
            character,
            AtlasId(index as u32),
            region,
            metrics,
        ));
        self.glyphs.insert(character, Arc::clone(&glyph));
        Ok(glyph)
    }

    /// Append a new atlas large enough for `bitmap` and place it there.
    /// `insert` has already rejected bitmaps larger than `max_atlas_size`.
    fn grow(&mut self, bitmap: &RasterizedGlyph) -> Result<(usize, AtlasRegion)> {
        let (width, height) = (bitmap.metrics.width, bitmap.metrics.height);
        let max = self.config.max_atlas_size;
        let overflow = TextError::AtlasOverflow { width, height, max };

        let (mut atlas_width, mut atlas_height) = self.default_size;
        if width > atlas_width || height > atlas_height {
            atlas_width = atlas_width.max(width.saturating_mul(2)).min(max);
            atlas_height = atlas_height.max(height.saturating_mul(2)).min(max);
            self.default_size = (atlas_width, atlas_height);
            log::debug!("default atlas size raised to {atlas_width}x{atlas_height}");
        }

        let mut atlas = AtlasAllocator::new(atlas_width, atlas_height, self.config.format);
        let rect = atlas
            .place(width, height, &bitmap.data, bitmap.format)
            .ok_or(overflow)?;
        let region = atlas.tex_coords(&rect);

        let index = self.atlases.len();
        self.atlases.push(atlas);
        log::debug!("created glyph atlas #{index} ({atlas_width}x{atlas_height})");
        Ok((index, region))
    }
}

/// A run of cache lookups that shares one rasterizer session.
///
/// The session is opened on the first miss and closed when the batch is
/// dropped, including on early return with an error.
pub struct GlyphBatch<'a, R: Rasterizer> {
    cache: &'a mut GlyphCache<R>,
    session_open: bool,
}

impl<R: Rasterizer> GlyphBatch<'_, R> {
    pub fn get(&mut self, character: char) -> Result<Arc<Glyph>> {
        if let Some(glyph) = self.cache.glyphs.get(&character) {
            self.cache.stats.hits += 1;
            return Ok(Arc::clone(glyph));
        }

        if !self.session_open {
            self.cache.rasterizer.begin_session()?;
            self.session_open = true;
            self.cache.stats.sessions += 1;
        }

        log::trace!("glyph cache miss for {character:?}");
        self.cache.stats.misses += 1;
        let bitmap = self.cache.rasterizer.rasterize(character)?;
        self.cache.insert(character, bitmap)
    }
}

impl<R: Rasterizer> Drop for GlyphBatch<'_, R> {
    fn drop(&mut self) {
        if self.session_open {
            self.cache.rasterizer.end_session();
        }
    }
}

// ===================================================================
// Tests
// ===================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BoxRasterizer;

    fn small_config(size: u32) -> GlyphCacheConfig {
        GlyphCacheConfig {
            atlas_width: size,
            atlas_height: size,
            ..Default::default()
        }
    }

    #[test]
    fn test_get_is_idempotent() {
        let mut cache = GlyphCache::new(BoxRasterizer::new(8, 8, 8.0), GlyphCacheConfig::default());
        let first = cache.get('a').unwrap();
        let second = cache.get('a').unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.atlas(), second.atlas());
        assert_eq!(first.tex_coords(), second.tex_coords());
        assert_eq!(cache.rasterizer().rasterized, vec!['a']);
        assert_eq!(cache.glyph_count(), 1);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_get_many_matches_sequential_get() {
        let mut batched = GlyphCache::new(BoxRasterizer::new(6, 9, 7.0), GlyphCacheConfig::default());
        let mut single = GlyphCache::new(BoxRasterizer::new(6, 9, 7.0), GlyphCacheConfig::default());

        let many = batched.get_many("hello").unwrap();
        let one_by_one: Vec<_> = "hello".chars().map(|c| single.get(c).unwrap()).collect();

        assert_eq!(many.len(), 5);
        for (a, b) in many.iter().zip(&one_by_one) {
            assert_eq!(**a, **b);
        }
        // Repeated 'l' maps to the same glyph.
        assert!(Arc::ptr_eq(&many[2], &many[3]));
    }

    #[test]
    fn test_batch_opens_one_session_lazily() {
        let mut cache = GlyphCache::new(BoxRasterizer::new(4, 4, 4.0), GlyphCacheConfig::default());
        cache.get_many("abcabc").unwrap();
        assert_eq!(cache.rasterizer().sessions_begun, 1);
        assert_eq!(cache.rasterizer().sessions_ended, 1);

        // All hits: no session.
        cache.get_many("cab").unwrap();
        assert_eq!(cache.rasterizer().sessions_begun, 1);
        assert_eq!(cache.stats().sessions, 1);
    }

    #[test]
    fn test_missing_glyph_is_an_error_and_closes_session() {
        let raster = BoxRasterizer::new(4, 4, 4.0).without('?');
        let mut cache = GlyphCache::new(raster, GlyphCacheConfig::default());

        let err = cache.get_many("ab?c").unwrap_err();
        assert!(matches!(err, TextError::Rasterization { character: '?', .. }));
        assert_eq!(cache.rasterizer().sessions_begun, 1);
        assert_eq!(cache.rasterizer().sessions_ended, 1);

        // Glyphs before the failure stay cached; nothing after it was made.
        assert!(cache.contains('a') && cache.contains('b'));
        assert!(!cache.contains('?') && !cache.contains('c'));
    }

    #[test]
    fn test_full_atlas_appends_a_new_one() {
        let mut cache = GlyphCache::new(BoxRasterizer::new(16, 16, 16.0), small_config(32));
        for c in "abcd".chars() {
            assert_eq!(cache.get(c).unwrap().atlas(), AtlasId(0));
        }
        assert_eq!(cache.get('e').unwrap().atlas(), AtlasId(1));
        assert_eq!(cache.atlas_count(), 2);
        assert_eq!(cache.atlas(AtlasId(1)).unwrap().width(), 32);
    }

    #[test]
    fn test_newest_atlas_is_tried_first() {
        let raster = BoxRasterizer::new(20, 20, 20.0).with_glyph('.', 8, 8, 8.0);
        let mut cache = GlyphCache::new(raster, small_config(32));
        assert_eq!(cache.get('a').unwrap().atlas(), AtlasId(0));
        assert_eq!(cache.get('b').unwrap().atlas(), AtlasId(1));

        // Would also fit next to 'a', but the newest atlas wins.
        assert_eq!(cache.get('.').unwrap().atlas(), AtlasId(1));
    }

    #[test]
    fn test_oversized_glyph_grows_default_size() {
        let raster = BoxRasterizer::new(4, 4, 4.0).with_glyph('W', 40, 10, 40.0);
        let mut cache = GlyphCache::new(raster, small_config(32));
        cache.get('a').unwrap();

        let wide = cache.get('W').unwrap();
        assert_eq!(wide.atlas(), AtlasId(1));
        let atlas = cache.atlas(AtlasId(1)).unwrap();
        assert_eq!((atlas.width(), atlas.height()), (80, 32));
        assert_eq!(cache.default_atlas_size(), (80, 32));
    }

    #[test]
    fn test_glyph_larger_than_max_atlas_overflows() {
        let raster = BoxRasterizer::new(4, 4, 4.0).with_glyph('@', 100, 10, 100.0);
        let config = GlyphCacheConfig {
            max_atlas_size: 64,
            ..small_config(32)
        };
        let mut cache = GlyphCache::new(raster, config);

        let err = cache.get('@').unwrap_err();
        assert_eq!(
            err,
            TextError::AtlasOverflow {
                width: 100,
                height: 10,
                max: 64
            }
        );
        assert_eq!(cache.atlas_count(), 0);
        assert!(!cache.contains('@'));
    }

    #[test]
    fn test_huge_glyph_after_first_shelf_overflows() {
        let raster = BoxRasterizer::new(16, 16, 16.0)
            .with_glyph('H', 16, u32::MAX - 5, 16.0)
            .with_pixels('H', Vec::new());
        let mut cache = GlyphCache::new(raster, small_config(32));
        // 'c' opens the second shelf at y = 16.
        cache.get_many("abc").unwrap();
        assert_eq!(cache.atlas(AtlasId(0)).unwrap().cursor(), (16, 16));

        let err = cache.get('H').unwrap_err();
        assert_eq!(
            err,
            TextError::AtlasOverflow {
                width: 16,
                height: u32::MAX - 5,
                max: 4096
            }
        );
        assert!(!cache.contains('H'));
        assert_eq!(cache.atlas_count(), 1);

        // The atlas is untouched and still accepts glyphs.
        assert_eq!(cache.atlas(AtlasId(0)).unwrap().placed_count(), 3);
        assert_eq!(cache.get('d').unwrap().atlas(), AtlasId(0));
    }

    #[test]
    fn test_bitmap_length_mismatch_is_an_error() {
        let raster = BoxRasterizer::new(4, 4, 4.0)
            .with_pixels('s', vec![1; 10])
            .with_pixels('l', vec![1; 17]);
        let mut cache = GlyphCache::new(raster, GlyphCacheConfig::default());

        for c in ['s', 'l'] {
            let err = cache.get(c).unwrap_err();
            assert!(matches!(err, TextError::Rasterization { character, .. } if character == c));
            assert!(!cache.contains(c));
        }
        assert_eq!(cache.atlas_count(), 0);
    }

    #[test]
    fn test_growth_clamps_to_max_atlas_size() {
        let raster = BoxRasterizer::new(4, 4, 4.0).with_glyph('M', 50, 10, 50.0);
        let config = GlyphCacheConfig {
            max_atlas_size: 64,
            ..small_config(32)
        };
        let mut cache = GlyphCache::new(raster, config);
        cache.get('M').unwrap();
        assert_eq!(cache.default_atlas_size(), (64, 32));
    }

    #[test]
    fn test_take_dirty_atlases() {
        let mut cache = GlyphCache::new(BoxRasterizer::new(16, 16, 16.0), small_config(32));
        cache.get_many("abcde").unwrap();
        assert_eq!(cache.take_dirty_atlases(), vec![AtlasId(0), AtlasId(1)]);
        assert!(cache.take_dirty_atlases().is_empty());

        cache.get('f').unwrap();
        assert_eq!(cache.take_dirty_atlases(), vec![AtlasId(1)]);
    }

    #[test]
    fn test_pixels_copied_into_atlas() {
        let mut cache = GlyphCache::new(BoxRasterizer::new(2, 2, 2.0), small_config(8));
        let glyph = cache.get('A').unwrap();
        let atlas = cache.atlas(glyph.atlas()).unwrap();
        assert_eq!(atlas.data()[0], b'A');
        assert_eq!(atlas.data()[8 + 1], b'A');
    }
}
