use std::fmt;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::{EditorError, Result};

// ============================================================================
// PIXEL BUFFER - 64×64 chunk storage with copy-on-write chunks
// ============================================================================

pub const CHUNK_SIZE: u32 = 64;

/// Largest accepted image area.
pub const MAX_PIXELS: u64 = 256_000_000;

/// The canvas background: what clear, erase and canvas growth paint with.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A pixel with every channel zero; missing chunks read as this.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// An RGBA8 raster with value semantics.
///
/// Pixels live in a flat `Vec<Option<Arc<RgbaImage>>>` of 64×64 chunks,
/// indexed as `cy * chunks_per_row + cx`. A `None` chunk is all
/// [`TRANSPARENT`].
///
/// `clone()` only bumps chunk reference counts. Every write goes through
/// `Arc::make_mut`, which copies a chunk the first time it is written while
/// shared, so a clone can never observe later writes to the original and
/// vice versa. That is what makes a history snapshot cost O(chunks) instead
/// of O(pixels).
#[derive(Clone)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    chunks_per_row: u32,
    chunks: Vec<Option<Arc<RgbaImage>>>,
}

impl PixelBuffer {
    // ---- construction -------------------------------------------------------

    /// A fully transparent buffer. Zero-area and oversized dimensions are rejected.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::EmptyImage { width, height });
        }
        if (width as u64) * (height as u64) > MAX_PIXELS {
            return Err(EditorError::TooLarge { width, height });
        }
        let chunks_per_row = width.div_ceil(CHUNK_SIZE);
        let chunks_per_col = height.div_ceil(CHUNK_SIZE);
        Ok(Self {
            width,
            height,
            chunks_per_row,
            chunks: vec![None; (chunks_per_row * chunks_per_col) as usize],
        })
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self> {
        let mut img = Self::new(width, height)?;
        if color != TRANSPARENT {
            img.fill(color);
        }
        Ok(img)
    }

    /// Import from a flat `RgbaImage`. Chunks that are entirely
    /// [`TRANSPARENT`] are not stored. Chunk conversion runs on rayon.
    pub fn from_rgba_image(src: &RgbaImage) -> Result<Self> {
        let width = src.width();
        let height = src.height();
        let mut img = Self::new(width, height)?;

        let chunks_x = img.chunks_per_row as usize;
        let total_chunks = img.chunks.len();
        let src_raw = src.as_raw();

        let chunk_results: Vec<Option<Arc<RgbaImage>>> = (0..total_chunks)
            .into_par_iter()
            .map(|flat| {
                let base_x = (flat % chunks_x) as u32 * CHUNK_SIZE;
                let base_y = (flat / chunks_x) as u32 * CHUNK_SIZE;
                let cw = CHUNK_SIZE.min(width - base_x);
                let ch = CHUNK_SIZE.min(height - base_y);
                let chunk_stride = CHUNK_SIZE as usize * 4;
                let mut chunk_data = vec![0u8; chunk_stride * CHUNK_SIZE as usize];
                let mut has_content = false;

                for ly in 0..ch {
                    let src_start = ((base_y + ly) as usize * width as usize + base_x as usize) * 4;
                    let dst_start = ly as usize * chunk_stride;
                    let byte_len = cw as usize * 4;
                    let row = &src_raw[src_start..src_start + byte_len];
                    chunk_data[dst_start..dst_start + byte_len].copy_from_slice(row);
                    has_content = has_content || row.iter().any(|&b| b != 0);
                }

                if has_content {
                    RgbaImage::from_raw(CHUNK_SIZE, CHUNK_SIZE, chunk_data).map(Arc::new)
                } else {
                    None
                }
            })
            .collect();

        img.chunks = chunk_results;
        Ok(img)
    }

    /// Flatten back to a contiguous `RgbaImage`.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        let out_stride = self.width as usize * 4;
        let chunk_stride = CHUNK_SIZE as usize * 4;
        let out_raw: &mut [u8] = out.as_mut();
        for (idx, slot) in self.chunks.iter().enumerate() {
            let Some(chunk) = slot else { continue };
            let (base_x, base_y, cw, ch) = self.chunk_extent(idx);
            let chunk_raw = chunk.as_raw();
            for ly in 0..ch as usize {
                let src_start = ly * chunk_stride;
                let dst_start = (base_y as usize + ly) * out_stride + base_x as usize * 4;
                let len = cw as usize * 4;
                out_raw[dst_start..dst_start + len]
                    .copy_from_slice(&chunk_raw[src_start..src_start + len]);
            }
        }
        out
    }

    // ---- geometry -----------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn flat_index(&self, x: u32, y: u32) -> usize {
        ((y / CHUNK_SIZE) * self.chunks_per_row + x / CHUNK_SIZE) as usize
    }

    /// Pixel-space origin and visible size of the chunk at `idx`.
    fn chunk_extent(&self, idx: usize) -> (u32, u32, u32, u32) {
        let base_x = (idx as u32 % self.chunks_per_row) * CHUNK_SIZE;
        let base_y = (idx as u32 / self.chunks_per_row) * CHUNK_SIZE;
        (
            base_x,
            base_y,
            CHUNK_SIZE.min(self.width - base_x),
            CHUNK_SIZE.min(self.height - base_y),
        )
    }

    // ---- pixel access -------------------------------------------------------

    /// Read a pixel. Out-of-bounds reads return [`TRANSPARENT`].
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        if x >= self.width || y >= self.height {
            return TRANSPARENT;
        }
        self.chunks[self.flat_index(x, y)]
            .as_ref()
            .map(|c| *c.get_pixel(x % CHUNK_SIZE, y % CHUNK_SIZE))
            .unwrap_or(TRANSPARENT)
    }

    /// Write a pixel (creates the chunk on demand, COW-clones if shared).
    /// Out-of-bounds writes are ignored.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.flat_index(x, y);
        let arc = self.chunks[idx]
            .get_or_insert_with(|| Arc::new(RgbaImage::new(CHUNK_SIZE, CHUNK_SIZE)));
        Arc::make_mut(arc).put_pixel(x % CHUNK_SIZE, y % CHUNK_SIZE, pixel);
    }

    /// Source-over composite `color` onto the pixel at (`x`, `y`), with the
    /// colour's own alpha scaled by `strength` (0.0..=1.0). Signed coordinates
    /// so callers can rasterise shapes that hang off the canvas edge.
    pub fn blend_pixel(&mut self, x: i32, y: i32, color: Rgba<u8>, strength: f32) {
        if !self.contains(x, y) {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let blended = blend_over(self.get_pixel(x, y), color, strength);
        self.put_pixel(x, y, blended);
    }

    // ---- bulk operations ----------------------------------------------------

    /// Fill every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        if color == TRANSPARENT {
            self.chunks.iter_mut().for_each(|slot| *slot = None);
            return;
        }
        let solid = Arc::new(RgbaImage::from_pixel(CHUNK_SIZE, CHUNK_SIZE, color));
        // All chunks share one allocation until they are written to.
        self.chunks.iter_mut().for_each(|slot| *slot = Some(Arc::clone(&solid)));
    }

    /// Apply `f` to every pixel, chunks in parallel. Missing chunks are
    /// materialised when `f` maps [`TRANSPARENT`] to something else.
    pub fn map_pixels<F>(&mut self, f: F)
    where
        F: Fn(Rgba<u8>) -> Rgba<u8> + Sync,
    {
        let blank = f(TRANSPARENT);
        self.chunks.par_iter_mut().for_each(|slot| match slot {
            Some(arc) => {
                for px in Arc::make_mut(arc).pixels_mut() {
                    *px = f(*px);
                }
            }
            None => {
                if blank != TRANSPARENT {
                    *slot = Some(Arc::new(RgbaImage::from_pixel(CHUNK_SIZE, CHUNK_SIZE, blank)));
                }
            }
        });
    }

    /// Build a `new_w`×`new_h` buffer where each source pixel (x, y) lands at
    /// `map(x, y)`. `map` must stay inside the new bounds. Exact: no
    /// resampling, only stored non-transparent pixels are moved.
    pub(crate) fn remap<F>(&self, new_w: u32, new_h: u32, map: F) -> PixelBuffer
    where
        F: Fn(u32, u32) -> (u32, u32),
    {
        let mut out = PixelBuffer {
            width: new_w,
            height: new_h,
            chunks_per_row: new_w.div_ceil(CHUNK_SIZE),
            chunks: vec![None; (new_w.div_ceil(CHUNK_SIZE) * new_h.div_ceil(CHUNK_SIZE)) as usize],
        };
        for (idx, slot) in self.chunks.iter().enumerate() {
            let Some(chunk) = slot else { continue };
            let (base_x, base_y, cw, ch) = self.chunk_extent(idx);
            for ly in 0..ch {
                for lx in 0..cw {
                    let px = *chunk.get_pixel(lx, ly);
                    if px == TRANSPARENT {
                        continue;
                    }
                    let (dx, dy) = map(base_x + lx, base_y + ly);
                    out.put_pixel(dx, dy, px);
                }
            }
        }
        out
    }

    /// Copy every pixel of `src` into `self`, offset by (`dx`, `dy`).
    /// Pixels that land outside `self` are dropped.
    pub fn copy_from(&mut self, src: &PixelBuffer, dx: i32, dy: i32) {
        for y in 0..src.height {
            let ty = y as i64 + dy as i64;
            if ty < 0 || ty >= self.height as i64 {
                continue;
            }
            for x in 0..src.width {
                let tx = x as i64 + dx as i64;
                if tx < 0 || tx >= self.width as i64 {
                    continue;
                }
                self.put_pixel(tx as u32, ty as u32, src.get_pixel(x, y));
            }
        }
    }

    // ---- memory accounting --------------------------------------------------

    /// Bytes of chunk storage referenced by this buffer (ignoring sharing).
    pub fn memory_bytes(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_some()).count() * chunk_bytes()
    }

    /// Identity of every stored chunk. Two buffers sharing a chunk report the
    /// same id, so a caller can count shared storage once.
    pub fn chunk_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.chunks
            .iter()
            .filter_map(|c| c.as_ref())
            .map(|arc| Arc::as_ptr(arc) as usize)
    }
}

/// Size in bytes of one stored chunk.
pub fn chunk_bytes() -> usize {
    (CHUNK_SIZE * CHUNK_SIZE * 4) as usize
}

/// Source-over blend of `src` (alpha scaled by `strength`) onto `dst`.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>, strength: f32) -> Rgba<u8> {
    let sa = (src[3] as f32 / 255.0) * strength.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    if sa >= 1.0 {
        return src;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |c: usize| -> u8 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    Rgba([mix(0), mix(1), mix(2), (out_a * 255.0).round() as u8])
}

impl PartialEq for PixelBuffer {
    /// Pixel-for-pixel equality over the visible area.
    fn eq(&self, other: &Self) -> bool {
        if self.width != other.width || self.height != other.height {
            return false;
        }
        for (idx, (a, b)) in self.chunks.iter().zip(&other.chunks).enumerate() {
            match (a, b) {
                (None, None) => continue,
                (Some(a), Some(b)) if Arc::ptr_eq(a, b) => continue,
                _ => {}
            }
            let (_, _, cw, ch) = self.chunk_extent(idx);
            for ly in 0..ch {
                for lx in 0..cw {
                    let pa = a.as_ref().map_or(TRANSPARENT, |c| *c.get_pixel(lx, ly));
                    let pb = b.as_ref().map_or(TRANSPARENT, |c| *c.get_pixel(lx, ly));
                    if pa != pb {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl Eq for PixelBuffer {}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stored_chunks", &self.chunks.iter().filter(|c| c.is_some()).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimensions_are_rejected() {
        assert!(matches!(
            PixelBuffer::new(0, 10),
            Err(EditorError::EmptyImage { width: 0, height: 10 })
        ));
        assert!(PixelBuffer::new(10, 0).is_err());
        assert!(matches!(
            PixelBuffer::new(100_000, 100_000),
            Err(EditorError::TooLarge { .. })
        ));
    }

    #[test]
    fn clone_is_independent_of_later_writes() {
        let mut live = PixelBuffer::new_filled(100, 70, BACKGROUND).unwrap();
        let snapshot = live.clone();
        live.put_pixel(65, 65, Rgba([1, 2, 3, 255]));

        assert_eq!(snapshot.get_pixel(65, 65), BACKGROUND);
        assert_eq!(live.get_pixel(65, 65), Rgba([1, 2, 3, 255]));
        assert_ne!(live, snapshot);
    }

    #[test]
    fn rgba_image_round_trip_keeps_pixels() {
        let mut src = RgbaImage::new(70, 3);
        src.put_pixel(0, 0, Rgba([10, 20, 30, 40]));
        src.put_pixel(69, 2, Rgba([50, 0, 0, 0]));
        let buf = PixelBuffer::from_rgba_image(&src).unwrap();
        assert_eq!(buf.get_pixel(69, 2), Rgba([50, 0, 0, 0]));
        assert_eq!(buf.to_rgba_image(), src);
    }

    #[test]
    fn equality_ignores_storage_layout() {
        let stored = PixelBuffer::from_rgba_image(&RgbaImage::new(10, 10)).unwrap();
        let mut written = PixelBuffer::new(10, 10).unwrap();
        written.put_pixel(3, 3, TRANSPARENT);
        assert_eq!(stored, written);
    }

    #[test]
    fn blend_respects_strength() {
        let white = Rgba([255, 255, 255, 255]);
        let black = Rgba([0, 0, 0, 255]);
        assert_eq!(blend_over(white, black, 1.0), black);
        assert_eq!(blend_over(white, black, 0.0), white);
        let half = blend_over(white, black, 0.5);
        assert_eq!(half, Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn map_pixels_materialises_blank_chunks() {
        let mut buf = PixelBuffer::new(5, 5).unwrap();
        buf.map_pixels(|p| Rgba([255 - p[0], 255 - p[1], 255 - p[2], p[3]]));
        assert_eq!(buf.get_pixel(4, 4), Rgba([255, 255, 255, 0]));
    }

    #[test]
    fn shared_fill_is_counted_once_by_id() {
        let buf = PixelBuffer::new_filled(128, 128, BACKGROUND).unwrap();
        let ids: std::collections::HashSet<usize> = buf.chunk_ids().collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(buf.memory_bytes(), 4 * chunk_bytes());
    }
}
