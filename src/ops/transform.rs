// ============================================================================
// TRANSFORM OPERATIONS - rotate, flip, invert, canvas resize, downscale
// ============================================================================

use image::imageops::{self, FilterType};

use crate::canvas::{BACKGROUND, PixelBuffer};
use crate::error::Result;

/// Clockwise quarter-turn rotations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse 90 / 180 / 270. Any other angle is not an exact rotation.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rotation::Deg90 => "Rotate 90°",
            Rotation::Deg180 => "Rotate 180°",
            Rotation::Deg270 => "Rotate 270°",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirror left↔right.
    Horizontal,
    /// Mirror top↔bottom.
    Vertical,
}

impl FlipAxis {
    pub fn label(&self) -> &'static str {
        match self {
            FlipAxis::Horizontal => "Flip Horizontally",
            FlipAxis::Vertical => "Flip Vertically",
        }
    }
}

/// Rotate clockwise. 90° and 270° swap width and height.
pub fn rotate(src: &PixelBuffer, rotation: Rotation) -> PixelBuffer {
    let (w, h) = src.dimensions();
    match rotation {
        // (x, y) → (h - 1 - y, x)
        Rotation::Deg90 => src.remap(h, w, |x, y| (h - 1 - y, x)),
        Rotation::Deg180 => src.remap(w, h, |x, y| (w - 1 - x, h - 1 - y)),
        // (x, y) → (y, w - 1 - x)
        Rotation::Deg270 => src.remap(h, w, |x, y| (y, w - 1 - x)),
    }
}

pub fn flip(src: &PixelBuffer, axis: FlipAxis) -> PixelBuffer {
    let (w, h) = src.dimensions();
    match axis {
        FlipAxis::Horizontal => src.remap(w, h, |x, y| (w - 1 - x, y)),
        FlipAxis::Vertical => src.remap(w, h, |x, y| (x, h - 1 - y)),
    }
}

/// Invert RGB, keep alpha.
pub fn invert_colors(src: &PixelBuffer) -> PixelBuffer {
    let mut out = src.clone();
    out.map_pixels(|p| image::Rgba([255 - p[0], 255 - p[1], 255 - p[2], p[3]]));
    out
}

/// Change the drawing surface size. Content stays anchored at the top-left;
/// new area is background, content past the new edge is cropped.
pub fn resize_canvas(src: &PixelBuffer, new_w: u32, new_h: u32) -> Result<PixelBuffer> {
    let mut out = PixelBuffer::new_filled(new_w, new_h, BACKGROUND)?;
    out.copy_from(src, 0, 0);
    Ok(out)
}

/// Shift the whole image by (`dx`, `dy`); uncovered pixels become background.
pub fn translate(src: &PixelBuffer, dx: i32, dy: i32) -> PixelBuffer {
    let mut out = src.clone();
    out.fill(BACKGROUND);
    out.copy_from(src, dx, dy);
    out
}

/// Halve both sides (aspect preserved, each side at least 1) until the image
/// is strictly under `max_w`×`max_h`. Returns an unchanged copy when it
/// already fits.
pub fn fit_within(src: &PixelBuffer, max_w: u32, max_h: u32) -> Result<PixelBuffer> {
    let (mut w, mut h) = src.dimensions();
    if w < max_w && h < max_h {
        return Ok(src.clone());
    }

    let mut img = src.to_rgba_image();
    while (w >= max_w || h >= max_h) && (w > 1 || h > 1) {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        img = imageops::resize(&img, w, h, FilterType::Triangle);
    }
    tracing::debug!(from = ?src.dimensions(), to = ?(w, h), "downscaled image to fit bound");
    PixelBuffer::from_rgba_image(&img)
}
