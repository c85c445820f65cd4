use image::Rgba;

use crate::canvas::{BACKGROUND, PixelBuffer, blend_over};
use crate::ops::shapes::{ShapeKind, rasterize_capsule, rasterize_shape};
use crate::ops::transform;

pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 200;
pub const MIN_BRUSH_OPACITY: u8 = 1;
pub const MAX_BRUSH_OPACITY: u8 = 100;

/// What a pointer gesture does to the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BrushStyle {
    #[default]
    Pen,
    FountainPen,
    Spray,
    PaintBucket,
    Eraser,
    Move,
    Rectangle,
    Circle,
    Line,
}

impl BrushStyle {
    pub fn label(&self) -> &'static str {
        match self {
            BrushStyle::Pen => "Pen",
            BrushStyle::FountainPen => "Fountain Pen",
            BrushStyle::Spray => "Spray",
            BrushStyle::PaintBucket => "Paint Bucket",
            BrushStyle::Eraser => "Eraser",
            BrushStyle::Move => "Move",
            BrushStyle::Rectangle => "Rectangle",
            BrushStyle::Circle => "Circle",
            BrushStyle::Line => "Line",
        }
    }

    pub fn all() -> &'static [BrushStyle] {
        &[
            BrushStyle::Pen,
            BrushStyle::FountainPen,
            BrushStyle::Spray,
            BrushStyle::PaintBucket,
            BrushStyle::Eraser,
            BrushStyle::Move,
            BrushStyle::Rectangle,
            BrushStyle::Circle,
            BrushStyle::Line,
        ]
    }

    /// Case-insensitive lookup by label, ignoring spaces, dashes and underscores.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|s| s.label().replace(' ', "").to_lowercase() == key)
    }

    /// Rubber-band shape drawn by this style, if any.
    pub fn shape(&self) -> Option<ShapeKind> {
        match self {
            BrushStyle::Rectangle => Some(ShapeKind::Rectangle),
            BrushStyle::Circle => Some(ShapeKind::Ellipse),
            BrushStyle::Line => Some(ShapeKind::Line),
            _ => None,
        }
    }
}

/// Brush settings. Captured by value when a gesture starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushConfig {
    size: u32,
    opacity: u8,
    color: Rgba<u8>,
    style: BrushStyle,
    full_fill: bool,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            size: 2,
            opacity: MAX_BRUSH_OPACITY,
            color: Rgba([0, 0, 0, 255]),
            style: BrushStyle::Pen,
            full_fill: false,
        }
    }
}

impl BrushConfig {
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Opacity in percent, 1..=100.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn color(&self) -> Rgba<u8> {
        self.color
    }

    pub fn style(&self) -> BrushStyle {
        self.style
    }

    pub fn full_fill(&self) -> bool {
        self.full_fill
    }

    pub fn set_size(&mut self, size: u32) {
        self.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity.clamp(MIN_BRUSH_OPACITY, MAX_BRUSH_OPACITY);
    }

    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.color = color;
    }

    pub fn set_style(&mut self, style: BrushStyle) {
        self.style = style;
    }

    pub fn set_full_fill(&mut self, full_fill: bool) {
        self.full_fill = full_fill;
    }

    /// Opacity as a 0.0..=1.0 multiplier.
    pub fn strength(&self) -> f32 {
        self.opacity as f32 / MAX_BRUSH_OPACITY as f32
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.set_size(size);
        self
    }

    pub fn with_opacity(mut self, opacity: u8) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn with_color(mut self, color: Rgba<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn with_style(mut self, style: BrushStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_full_fill(mut self, full_fill: bool) -> Self {
        self.full_fill = full_fill;
        self
    }
}

// ============================================================================
// STROKE - one pointer gesture in progress
// ============================================================================

/// State of an in-progress gesture.
///
/// Painting is composited against `base` (the canvas as it was when the
/// gesture began) through a per-pixel coverage mask, so a pixel is painted
/// at most once per stroke at the brush opacity no matter how many dabs
/// overlap it.
pub struct Stroke {
    config: BrushConfig,
    base: PixelBuffer,
    coverage: Vec<bool>,
    anchor: (i32, i32),
    last: (i32, i32),
    /// Increments per spray burst to vary the scatter pattern.
    stamp_counter: u32,
}

impl Stroke {
    /// Start a gesture at (`x`, `y`), applying its initial mark to `live`.
    pub fn begin(config: BrushConfig, live: &mut PixelBuffer, x: i32, y: i32) -> Self {
        let (w, h) = live.dimensions();
        let mut stroke = Self {
            config,
            base: live.clone(),
            coverage: vec![false; w as usize * h as usize],
            anchor: (x, y),
            last: (x, y),
            stamp_counter: 0,
        };

        match config.style() {
            BrushStyle::Pen | BrushStyle::Eraser | BrushStyle::FountainPen => {
                stroke.paint_segment(live, (x, y), (x, y));
            }
            BrushStyle::Spray => stroke.spray_burst(live, x, y),
            BrushStyle::PaintBucket => stroke.bucket_fill(live, x, y),
            BrushStyle::Rectangle | BrushStyle::Circle | BrushStyle::Line => {
                stroke.redraw_shape(live, x, y);
            }
            BrushStyle::Move => {}
        }
        stroke
    }

    /// Continue the gesture to (`x`, `y`).
    pub fn extend(&mut self, live: &mut PixelBuffer, x: i32, y: i32) {
        match self.config.style() {
            BrushStyle::Pen | BrushStyle::Eraser | BrushStyle::FountainPen => {
                self.paint_segment(live, self.last, (x, y));
            }
            BrushStyle::Spray => self.spray_burst(live, x, y),
            BrushStyle::PaintBucket => {}
            BrushStyle::Rectangle | BrushStyle::Circle | BrushStyle::Line => {
                self.redraw_shape(live, x, y);
            }
            BrushStyle::Move => {
                *live = transform::translate(&self.base, x - self.anchor.0, y - self.anchor.1);
            }
        }
        self.last = (x, y);
    }

    pub fn config(&self) -> &BrushConfig {
        &self.config
    }

    /// The canvas as it was before the gesture.
    pub fn base(&self) -> &PixelBuffer {
        &self.base
    }

    /// History label for the finished gesture.
    pub fn label(&self) -> String {
        match self.config.style() {
            BrushStyle::PaintBucket => "Paint Bucket".to_string(),
            BrushStyle::Move => "Move".to_string(),
            style if style.shape().is_some() => format!("Draw {}", style.label()),
            style => format!("{} Stroke", style.label()),
        }
    }

    /// Paint one pixel at full coverage unless this stroke already did.
    fn paint(&mut self, live: &mut PixelBuffer, x: i32, y: i32) {
        if !live.contains(x, y) {
            return;
        }
        let idx = y as usize * live.width() as usize + x as usize;
        if self.coverage[idx] {
            return;
        }
        self.coverage[idx] = true;

        let (color, strength) = match self.config.style() {
            BrushStyle::Eraser => (BACKGROUND, 1.0),
            _ => (self.config.color(), self.config.strength()),
        };
        let under = self.base.get_pixel(x as u32, y as u32);
        live.put_pixel(x as u32, y as u32, blend_over(under, color, strength));
    }

    fn paint_segment(&mut self, live: &mut PixelBuffer, from: (i32, i32), to: (i32, i32)) {
        let a = (from.0 as f32 + 0.5, from.1 as f32 + 0.5);
        let b = (to.0 as f32 + 0.5, to.1 as f32 + 0.5);
        let size = self.config.size() as f32;
        let clip = live.dimensions();

        if self.config.style() == BrushStyle::FountainPen {
            // Flat nib held at 45°: sweep it along the segment one pixel at a time.
            let half_len = size / 2.0;
            let nib = (std::f32::consts::FRAC_1_SQRT_2 * half_len, -std::f32::consts::FRAC_1_SQRT_2 * half_len);
            let thickness = (size / 4.0).max(1.0);
            let dist = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
            let steps = dist.ceil().max(1.0) as usize;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let c = (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
                rasterize_capsule(
                    (c.0 - nib.0, c.1 - nib.1),
                    (c.0 + nib.0, c.1 + nib.1),
                    thickness / 2.0,
                    clip,
                    &mut |x, y| self.paint(live, x, y),
                );
            }
        } else {
            rasterize_capsule(a, b, size / 2.0, clip, &mut |x, y| self.paint(live, x, y));
        }
    }

    fn spray_burst(&mut self, live: &mut PixelBuffer, x: i32, y: i32) {
        self.stamp_counter = self.stamp_counter.wrapping_add(1);
        let radius = (self.config.size() as f32 / 2.0).max(1.0);
        let dots = (self.config.size() * 2).max(8);
        let cx = x as f32 + 0.5;
        let cy = y as f32 + 0.5;
        for i in 0..dots {
            let h = stamp_hash(x, y, self.stamp_counter.wrapping_mul(7919).wrapping_add(i));
            let angle = (h & 0xFFFF) as f32 / 65536.0 * std::f32::consts::TAU;
            // sqrt keeps the scatter uniform over the disc area
            let dist = ((h >> 16) as f32 / 65536.0).sqrt() * radius;
            let px = (cx + angle.cos() * dist).floor() as i32;
            let py = (cy + angle.sin() * dist).floor() as i32;
            self.paint(live, px, py);
        }
    }

    fn bucket_fill(&mut self, live: &mut PixelBuffer, x: i32, y: i32) {
        if !live.contains(x, y) {
            return;
        }
        let flat = live.to_rgba_image();
        let (w, h) = live.dimensions();
        let mask = flood_fill_mask(flat.as_raw(), x as u32, y as u32, w, h);
        for (idx, hit) in mask.iter().enumerate() {
            if *hit {
                self.paint(live, (idx % w as usize) as i32, (idx / w as usize) as i32);
            }
        }
    }

    /// Reset to the gesture-start canvas and draw the shape anchor→(x, y).
    fn redraw_shape(&mut self, live: &mut PixelBuffer, x: i32, y: i32) {
        let Some(kind) = self.config.style().shape() else { return };
        *live = self.base.clone();
        self.coverage.iter_mut().for_each(|c| *c = false);

        let filled = kind.is_closed() && self.config.full_fill();
        let (anchor, width, clip) = (self.anchor, self.config.size(), live.dimensions());
        rasterize_shape(kind, anchor, (x, y), width, filled, clip, &mut |px, py| {
            self.paint(live, px, py);
        });
    }
}

/// Positional hash for deterministic scatter.
fn stamp_hash(x: i32, y: i32, counter: u32) -> u32 {
    let mut h = (x as u32)
        .wrapping_mul(374761393)
        .wrapping_add((y as u32).wrapping_mul(668265263))
        .wrapping_add(counter.wrapping_mul(1013904223));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// 4-connected region of pixels exactly matching the seed colour.
/// `flat` is row-major RGBA; returns one flag per pixel.
fn flood_fill_mask(flat: &[u8], start_x: u32, start_y: u32, w: u32, h: u32) -> Vec<bool> {
    let wu = w as usize;
    let mut mask = vec![false; wu * h as usize];
    if start_x >= w || start_y >= h {
        return mask;
    }

    #[inline(always)]
    fn pix(flat: &[u8], idx: usize) -> [u8; 4] {
        let o = idx * 4;
        [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
    }

    let seed_idx = start_y as usize * wu + start_x as usize;
    let target = pix(flat, seed_idx);

    // DFS over packed flat indices
    let mut stack: Vec<usize> = Vec::with_capacity(4096);
    mask[seed_idx] = true;
    stack.push(seed_idx);

    while let Some(idx) = stack.pop() {
        let x = idx % wu;
        let y = idx / wu;
        let visit = |ni: usize, mask: &mut [bool], stack: &mut Vec<usize>| {
            if !mask[ni] && pix(flat, ni) == target {
                mask[ni] = true;
                stack.push(ni);
            }
        };
        if x > 0 {
            visit(idx - 1, &mut mask, &mut stack);
        }
        if x + 1 < wu {
            visit(idx + 1, &mut mask, &mut stack);
        }
        if y > 0 {
            visit(idx - wu, &mut mask, &mut stack);
        }
        if y + 1 < h as usize {
            visit(idx + wu, &mut mask, &mut stack);
        }
    }
    mask
}
