// ============================================================================
// SHAPE RASTERISATION - rectangle, ellipse and line primitives
// ============================================================================

/// Rubber-band shape primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Line,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Ellipse => "Circle",
            ShapeKind::Line => "Line",
        }
    }

    /// Lines have no interior, so the full-fill flag does not apply to them.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ShapeKind::Line)
    }
}

// ============================================================================
// SDF functions - return signed distance (negative = inside)
// ============================================================================

/// SDF for a box centred at origin with half-extents (hx, hy).
#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let outside = (dx.max(0.0) * dx.max(0.0) + dy.max(0.0) * dy.max(0.0)).sqrt();
    let inside = dx.max(dy).min(0.0);
    outside + inside
}

/// SDF for an ellipse (approximation).
#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    // Normalise to circle space, then scale the distance back
    let nx = px / rx;
    let ny = py / ry;
    let len = (nx * nx + ny * ny).sqrt();
    if len < 1e-8 {
        return -rx.min(ry);
    }
    let scale = (rx * rx * ny * ny + ry * ry * nx * nx).sqrt() / (rx * ry * len);
    (len - 1.0) / scale
}

/// Distance from (px, py) to the segment a→b. A zero-length segment is a point.
#[inline]
pub fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;
    let t = if len2 < 1e-6 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0)
    };
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Call `plot` for every pixel whose centre lies within `radius` of the
/// segment a→b (coordinates in pixel-centre space, i.e. pixel `x` has its
/// centre at `x + 0.5`). Only pixels inside a `clip` (width, height) canvas
/// are reported. Pixels may be reported more than once across calls.
pub fn rasterize_capsule<F>(a: (f32, f32), b: (f32, f32), radius: f32, clip: (u32, u32), plot: &mut F)
where
    F: FnMut(i32, i32),
{
    let radius = radius.max(0.5);
    let (min_x, max_x) = clip_span(
        (a.0.min(b.0) - radius).floor() as i32,
        (a.0.max(b.0) + radius).ceil() as i32,
        clip.0,
    );
    let (min_y, max_y) = clip_span(
        (a.1.min(b.1) - radius).floor() as i32,
        (a.1.max(b.1) + radius).ceil() as i32,
        clip.1,
    );
    for py in min_y..=max_y {
        for px in min_x..=max_x {
            let d = sdf_line_segment(px as f32 + 0.5, py as f32 + 0.5, a.0, a.1, b.0, b.1);
            if d <= radius {
                plot(px, py);
            }
        }
    }
}

/// Rasterise a shape dragged from pixel `from` to pixel `to` (both
/// inclusive corners of the bounding box, in any order).
///
/// * `stroke_width`: outline thickness in pixels (min 1).
/// * `filled`: paint the interior of closed shapes instead of the outline.
/// * `clip`: canvas (width, height); nothing outside it is reported.
pub fn rasterize_shape<F>(
    kind: ShapeKind,
    from: (i32, i32),
    to: (i32, i32),
    stroke_width: u32,
    filled: bool,
    clip: (u32, u32),
    plot: &mut F,
) where
    F: FnMut(i32, i32),
{
    let width = stroke_width.max(1) as f32;

    if kind == ShapeKind::Line {
        let a = (from.0 as f32 + 0.5, from.1 as f32 + 0.5);
        let b = (to.0 as f32 + 0.5, to.1 as f32 + 0.5);
        rasterize_capsule(a, b, width / 2.0, clip, plot);
        return;
    }

    let (x0, x1) = (from.0.min(to.0), from.0.max(to.0));
    let (y0, y1) = (from.1.min(to.1), from.1.max(to.1));
    let hx = (x1 - x0 + 1) as f32 / 2.0;
    let hy = (y1 - y0 + 1) as f32 / 2.0;
    let cx = x0 as f32 + hx;
    let cy = y0 as f32 + hy;

    let (sx0, sx1) = clip_span(x0, x1, clip.0);
    let (sy0, sy1) = clip_span(y0, y1, clip.1);
    for py in sy0..=sy1 {
        for px in sx0..=sx1 {
            let lx = px as f32 + 0.5 - cx;
            let ly = py as f32 + 0.5 - cy;
            let d = match kind {
                ShapeKind::Rectangle => sdf_box(lx, ly, hx, hy),
                _ => sdf_ellipse(lx, ly, hx, hy),
            };
            if d <= 0.0 && (filled || d > -width) {
                plot(px, py);
            }
        }
    }
}

/// Clamp an inclusive scan range to `0..len`. Empty ranges come back with
/// `lo > hi`.
fn clip_span(lo: i32, hi: i32, len: u32) -> (i32, i32) {
    let last = len.min(i32::MAX as u32) as i32 - 1;
    (lo.max(0), hi.min(last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collect(kind: ShapeKind, from: (i32, i32), to: (i32, i32), w: u32, filled: bool) -> HashSet<(i32, i32)> {
        let mut set = HashSet::new();
        rasterize_shape(kind, from, to, w, filled, (64, 64), &mut |x, y| {
            set.insert((x, y));
        });
        set
    }

    #[test]
    fn rectangle_outline_is_hollow() {
        let px = collect(ShapeKind::Rectangle, (0, 0), (4, 4), 1, false);
        assert!(px.contains(&(0, 0)));
        assert!(px.contains(&(4, 2)));
        assert!(!px.contains(&(2, 2)));
        assert_eq!(px.len(), 16);
    }

    #[test]
    fn filled_rectangle_covers_box_in_any_drag_direction() {
        let px = collect(ShapeKind::Rectangle, (4, 3), (1, 0), 1, true);
        assert_eq!(px.len(), 16);
        assert!(px.contains(&(2, 1)));
    }

    #[test]
    fn filled_ellipse_stays_inside_bounds() {
        let px = collect(ShapeKind::Ellipse, (0, 0), (10, 6), 1, true);
        assert!(px.contains(&(5, 3)));
        assert!(!px.contains(&(0, 0)));
        assert!(px.iter().all(|&(x, y)| (0..=10).contains(&x) && (0..=6).contains(&y)));
    }

    #[test]
    fn line_ignores_fill_and_hits_endpoints() {
        let px = collect(ShapeKind::Line, (0, 0), (9, 0), 1, true);
        assert!(px.contains(&(0, 0)));
        assert!(px.contains(&(9, 0)));
        assert!(!px.contains(&(0, 1)));
    }

    #[test]
    fn degenerate_capsule_is_a_dot() {
        let mut hits = Vec::new();
        rasterize_capsule((3.5, 3.5), (3.5, 3.5), 0.5, (8, 8), &mut |x, y| hits.push((x, y)));
        assert_eq!(hits, vec![(3, 3)]);
    }

    #[test]
    fn far_drag_is_clipped_to_canvas() {
        let mut count = 0;
        rasterize_shape(ShapeKind::Rectangle, (-5, -5), (2_000_000, 2_000_000), 1, true, (10, 10), &mut |x, y| {
            assert!((0..10).contains(&x) && (0..10).contains(&y));
            count += 1;
        });
        assert_eq!(count, 100);

        let mut hits = Vec::new();
        rasterize_capsule((0.5, 0.5), (3_000_000.5, 0.5), 0.5, (10, 10), &mut |x, y| hits.push((x, y)));
        assert_eq!(hits, (0..10).map(|x| (x, 0)).collect::<Vec<_>>());
    }
}
