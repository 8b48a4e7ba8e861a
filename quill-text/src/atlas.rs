//! Glyph atlas — CPU-side texture surface for glyph bitmaps.
//!
//! Uses a single-cursor "shelf" packing algorithm. Glyphs are placed left
//! to right along the current shelf; the shelf is as tall as the tallest
//! glyph placed on it so far. When a glyph doesn't fit the remaining shelf
//! width, a new shelf is started directly below.
//!
//! Placement is write-once: regions are handed out in insertion order and
//! are never moved, compacted or freed. Pixel data lives in a buffer owned
//! by the allocator; the renderer uploads it whenever [`AtlasAllocator::take_dirty`]
//! reports a change.

/// Pixel format of an atlas surface or a glyph bitmap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit coverage mask.
    #[default]
    Alpha,
    /// 8-bit RGBA, straight alpha.
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Alpha => 1,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A region within the atlas texture (UV coordinates normalized to [0,1]).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtlasRegion {
    /// Left U coordinate.
    pub u_min: f32,
    /// Top V coordinate (row 0 of the surface is the top row).
    pub v_min: f32,
    /// Right U coordinate.
    pub u_max: f32,
    /// Bottom V coordinate.
    pub v_max: f32,
}

/// Pixel-space rectangle within the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    /// Whether two rectangles share at least one pixel.
    pub fn intersects(&self, other: &AtlasRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// One fixed-size texture surface with shelf packing.
pub struct AtlasAllocator {
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Pixel data, `width * height * format.bytes_per_pixel()` bytes.
    data: Vec<u8>,
    /// Whether data has changed since the last upload.
    dirty: bool,
    cursor_x: u32,
    cursor_y: u32,
    /// Tallest glyph on the current shelf.
    shelf_height: u32,
    placed: usize,
}

impl AtlasAllocator {
    /// Create an empty surface of the given size and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let byte_count = width as usize * height as usize * format.bytes_per_pixel();
        Self {
            width,
            height,
            format,
            data: vec![0u8; byte_count],
            dirty: false,
            cursor_x: 0,
            cursor_y: 0,
            shelf_height: 0,
            placed: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw surface pixels, row-major, top row first.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of regions placed so far.
    pub fn placed_count(&self) -> usize {
        self.placed
    }

    /// Current shelf cursor as `(x, y)`.
    pub fn cursor(&self) -> (u32, u32) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns whether the surface changed since the last call, and resets
    /// the flag. Call when uploading `data()` to the GPU.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Place a `width` x `height` bitmap and copy its pixels into the surface.
    ///
    /// `pixels` is row-major in `format`; it is converted when `format`
    /// differs from the surface format. Returns `None`, leaving the cursor
    /// untouched, when the bitmap is wider than the surface or would run
    /// past the bottom edge even after starting a new shelf.
    pub fn place(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
        format: PixelFormat,
    ) -> Option<AtlasRect> {
        if width > self.width {
            return None;
        }

        // The cursor never passes the surface edges, so the subtractions
        // below cannot wrap.
        let (mut x, mut y, mut shelf_height) = (self.cursor_x, self.cursor_y, self.shelf_height);
        if width > self.width - x {
            y += shelf_height;
            x = 0;
            shelf_height = 0;
        }
        if height > self.height - y {
            return None;
        }

        let expected = Self::bitmap_len(width, height, format);
        if expected != Some(pixels.len()) {
            log::warn!(
                "{width}x{height} {format:?} bitmap has {} bytes, expected {expected:?}",
                pixels.len()
            );
        }

        let rect = AtlasRect {
            x,
            y,
            width,
            height,
        };
        self.cursor_x = x + width;
        self.cursor_y = y;
        self.shelf_height = shelf_height.max(height);
        self.placed += 1;

        self.blit(&rect, pixels, format);
        self.dirty = true;

        Some(rect)
    }

    /// Byte length of a `width` x `height` bitmap in `format`, or `None` if
    /// it does not fit in memory.
    pub fn bitmap_len(width: u32, height: u32, format: PixelFormat) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(format.bytes_per_pixel())
    }

    /// Convert a pixel rect to a normalized UV region.
    pub fn tex_coords(&self, rect: &AtlasRect) -> AtlasRegion {
        let inv_w = 1.0 / self.width as f32;
        let inv_h = 1.0 / self.height as f32;
        AtlasRegion {
            u_min: rect.x as f32 * inv_w,
            v_min: rect.y as f32 * inv_h,
            u_max: (rect.x + rect.width) as f32 * inv_w,
            v_max: (rect.y + rect.height) as f32 * inv_h,
        }
    }

    // ---------------------------------------------------------------
    // Internal helpers
    // ---------------------------------------------------------------

    /// Copy bitmap rows into the surface. Rows missing from short input
    /// stay blank; extra bytes are ignored.
    fn blit(&mut self, rect: &AtlasRect, pixels: &[u8], format: PixelFormat) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }

        let dst_bpp = self.format.bytes_per_pixel();
        let src_row_len = rect.width as usize * format.bytes_per_pixel();
        let dst_row_len = rect.width as usize * dst_bpp;

        for (row, src_row) in pixels
            .chunks_exact(src_row_len)
            .take(rect.height as usize)
            .enumerate()
        {
            let dst_start =
                ((rect.y as usize + row) * self.width as usize + rect.x as usize) * dst_bpp;
            let dst_row = &mut self.data[dst_start..dst_start + dst_row_len];

            match (format, self.format) {
                (PixelFormat::Alpha, PixelFormat::Alpha) | (PixelFormat::Rgba, PixelFormat::Rgba) => {
                    dst_row.copy_from_slice(src_row);
                }
                (PixelFormat::Alpha, PixelFormat::Rgba) => {
                    // White glyph with alpha.
                    for (dst, &alpha) in dst_row.chunks_exact_mut(4).zip(src_row) {
                        dst.copy_from_slice(&[255, 255, 255, alpha]);
                    }
                }
                (PixelFormat::Rgba, PixelFormat::Alpha) => {
                    for (dst, src) in dst_row.iter_mut().zip(src_row.chunks_exact(4)) {
                        *dst = src[3];
                    }
                }
            }
        }
    }
}

// ===================================================================
// Tests
// ===================================================================
