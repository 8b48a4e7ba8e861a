//! # quill-text
//!
//! Glyph atlas and shaped-text engine. Turns characters into packed atlas
//! bitmaps and immutable, pre-measured glyph runs that a renderer can draw
//! repeatedly without re-rasterizing or re-measuring.
//!
//! ## Architecture
//!
//! ```text
//! Font ── owns ──► GlyphCache<R: Rasterizer>
//!   │                 ├── HashMap<char, Arc<Glyph>>
//!   │                 └── Vec<AtlasAllocator>   (indexed by AtlasId)
//!   │
//!   ├─ glyphs_for_width(str, width) ──► Vec<Arc<Glyph>>   (one line)
//!   │
//!   ▼
//! ShapedString::build(glyphs, x, y)
//!   ├── cumulative advances  ──► subwidth / break_index / index_at
//!   └── spans per atlas      ──► draw(from, to, &mut impl GlyphRenderer)
//! ```
//!
//! - **`atlas`** — fixed-size surface with shelf packing.
//! - **`glyph`** — immutable per-character glyph records.
//! - **`raster`** — rasterizer capability and the cosmic-text backend.
//! - **`cache`** — per-font glyph cache, atlas growth.
//! - **`linebreak`** — greedy line breaking.
//! - **`shaped`** — shaped strings, draw spans.
//! - **`font`** — fonts and the explicit font library.

pub mod atlas;
pub mod cache;
pub mod error;
pub mod font;
pub mod glyph;
pub mod linebreak;
pub mod raster;
pub mod shaped;

#[cfg(test)]
mod testing;

// Re-exports for ergonomic use.
pub use atlas::{AtlasAllocator, AtlasRect, AtlasRegion, PixelFormat};
pub use cache::{GlyphBatch, GlyphCache, GlyphCacheConfig, GlyphCacheStats};
pub use error::{Result, TextError};
pub use font::{Font, FontDescriptor, FontLibrary};
pub use glyph::{AtlasId, Glyph, GlyphMetrics};
pub use linebreak::{glyphs_for_width, is_breakpoint};
pub use raster::{CosmicRasterizer, FontMetrics, RasterizedGlyph, Rasterizer, SharedFontSystem};
pub use shaped::{DrawBatch, DrawSpan, GlyphRenderer, GlyphVertex, ShapedString};
