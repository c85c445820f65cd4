use image::RgbaImage;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::canvas::{BACKGROUND, PixelBuffer};
use crate::components::history::History;
use crate::components::tools::{BrushConfig, Stroke};
use crate::error::Result;
use crate::ops::clipboard::ClipboardSource;
use crate::ops::transform::{self, FlipAxis, Rotation};
use crate::settings::EditorSettings;

/// Canvas size of a fresh session.
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

/// Bound applied to remote images before they reach the canvas.
pub const DEFAULT_FETCH_BOUND: (u32, u32) = (1920, 1080);

/// Receives redisplay notifications from a [`CanvasSession`].
pub trait DisplaySink {
    /// The live buffer was replaced wholesale; its size may have changed.
    fn buffer_replaced(&mut self, width: u32, height: u32);

    /// The live buffer was painted in place during a gesture.
    fn buffer_changed(&mut self) {}
}

// ============================================================================
// CANVAS SESSION - live buffer + commit boundaries
// ============================================================================

/// Owns the live pixel buffer and decides when a snapshot is committed.
///
/// Gestures (`begin_gesture` → `gesture_move`* → `end_gesture`) paint the
/// live buffer in place and commit exactly once, at the end. Atomic edits
/// (transforms, clear, resize, new image) replace the buffer and commit
/// immediately. An atomic edit issued while a gesture is open ends that
/// gesture first, so edits never interleave.
pub struct CanvasSession {
    id: Uuid,
    live: PixelBuffer,
    history: History,
    brush: BrushConfig,
    stroke: Option<Stroke>,
    pointer: (i32, i32),
    fetch_bound: (u32, u32),
    display: Option<Box<dyn DisplaySink>>,
}

impl CanvasSession {
    /// A blank white canvas with `capacity` history states.
    pub fn new(width: u32, height: u32, capacity: usize) -> Result<Self> {
        let canvas = PixelBuffer::new_filled(width, height, BACKGROUND)?;
        Ok(Self::from_image(canvas, capacity))
    }

    /// Start from an existing image; it becomes the initial history state.
    pub fn from_image(image: PixelBuffer, capacity: usize) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, width = image.width(), height = image.height(), capacity, "session created");
        Self {
            id,
            history: History::new(capacity, image.clone()),
            live: image,
            brush: BrushConfig::default(),
            stroke: None,
            pointer: (0, 0),
            fetch_bound: DEFAULT_FETCH_BOUND,
            display: None,
        }
    }

    /// A blank canvas configured from persisted settings.
    pub fn from_settings(settings: &EditorSettings) -> Result<Self> {
        let session = Self::new(settings.canvas_width, settings.canvas_height, settings.history_capacity)?;
        Ok(session.configured(settings))
    }

    /// Apply the non-canvas parts of `settings` (history budget, brush, fetch bound).
    pub fn configured(mut self, settings: &EditorSettings) -> Self {
        self.history.set_memory_budget(settings.history_memory_budget());
        self.brush.set_size(settings.brush_size);
        self.brush.set_opacity(settings.brush_opacity);
        self.fetch_bound = (settings.fetch_max_width, settings.fetch_max_height);
        self
    }

    pub fn set_display(&mut self, sink: Box<dyn DisplaySink>) {
        self.display = Some(sink);
        self.notify_replaced();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The live buffer as currently displayed.
    pub fn image(&self) -> &PixelBuffer {
        &self.live
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn brush(&self) -> &BrushConfig {
        &self.brush
    }

    /// Brush edits apply from the next gesture on.
    pub fn brush_mut(&mut self) -> &mut BrushConfig {
        &mut self.brush
    }

    pub fn set_brush(&mut self, brush: BrushConfig) {
        self.brush = brush;
    }

    pub fn fetch_bound(&self) -> (u32, u32) {
        self.fetch_bound
    }

    pub fn is_gesture_active(&self) -> bool {
        self.stroke.is_some()
    }

    /// Last pointer position reported by the display, in buffer coordinates.
    pub fn pointer_position(&self) -> (i32, i32) {
        self.pointer
    }

    // ---- gestures -----------------------------------------------------------

    /// Pointer down. Captures the brush configuration for the whole gesture.
    pub fn begin_gesture(&mut self, x: i32, y: i32) {
        if self.stroke.is_some() {
            warn!(session = %self.id, "gesture started while another was open; committing the open one");
            self.finish_open_gesture();
        }
        self.pointer = (x, y);
        self.stroke = Some(Stroke::begin(self.brush, &mut self.live, x, y));
        self.notify_changed();
    }

    /// Pointer move. Without an open gesture this only tracks the pointer.
    pub fn gesture_move(&mut self, x: i32, y: i32) {
        self.pointer = (x, y);
        if let Some(stroke) = self.stroke.as_mut() {
            stroke.extend(&mut self.live, x, y);
            self.notify_changed();
        }
    }

    /// Pointer up. Commits one snapshot; returns false when no gesture was open.
    pub fn end_gesture(&mut self, x: i32, y: i32) -> bool {
        if self.stroke.is_none() {
            return false;
        }
        self.gesture_move(x, y);
        self.finish_open_gesture();
        true
    }

    /// Abandon the open gesture. The live buffer goes back to the committed
    /// state and history is untouched. Returns false when nothing was open.
    pub fn cancel_gesture(&mut self) -> bool {
        if self.stroke.take().is_none() {
            return false;
        }
        debug!(session = %self.id, "gesture cancelled");
        self.live = self.history.current();
        self.notify_replaced();
        true
    }

    fn finish_open_gesture(&mut self) {
        if let Some(stroke) = self.stroke.take() {
            let label = stroke.label();
            self.commit(label);
        }
    }

    // ---- history ------------------------------------------------------------

    /// Restore the previous state. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        self.finish_open_gesture();
        match self.history.undo() {
            Some(snapshot) => {
                debug!(session = %self.id, cursor = self.history.cursor(), "undo");
                self.live = snapshot;
                self.notify_replaced();
                true
            }
            None => false,
        }
    }

    /// Re-apply the next state. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        self.finish_open_gesture();
        match self.history.redo() {
            Some(snapshot) => {
                debug!(session = %self.id, cursor = self.history.cursor(), "redo");
                self.live = snapshot;
                self.notify_replaced();
                true
            }
            None => false,
        }
    }

    // ---- atomic edits -------------------------------------------------------

    /// Replace the canvas wholesale (load, paste, drop) as one gesture.
    pub fn set_new_image(&mut self, image: PixelBuffer) {
        self.replace_and_commit("New Image", image);
    }

    /// Open `image` as a fresh document: any open gesture is dropped and the
    /// history restarts with `image` as its only state.
    pub fn load_document(&mut self, image: PixelBuffer) {
        self.stroke = None;
        self.live = image;
        self.history.reset(self.live.clone());
        debug!(session = %self.id, width = self.live.width(), height = self.live.height(), "document loaded");
        self.notify_replaced();
    }

    /// Like [`set_new_image`](Self::set_new_image) for a decoded flat image.
    /// A zero-area image is rejected and nothing changes.
    pub fn set_new_rgba(&mut self, image: &RgbaImage) -> Result<()> {
        let buffer = PixelBuffer::from_rgba_image(image).inspect_err(|e| {
            warn!(session = %self.id, error = %e, "rejected incoming image");
        })?;
        self.set_new_image(buffer);
        Ok(())
    }

    /// Accept a remote image, halving it until it fits the fetch bound.
    pub fn set_network_image(&mut self, image: PixelBuffer) -> Result<()> {
        let (max_w, max_h) = self.fetch_bound;
        let fitted = transform::fit_within(&image, max_w, max_h)?;
        self.replace_and_commit("Remote Image", fitted);
        Ok(())
    }

    /// Paste from `clipboard`. Returns false (and changes nothing) when the
    /// clipboard holds no image.
    pub fn paste(&mut self, clipboard: &mut dyn ClipboardSource) -> bool {
        match clipboard.read_image() {
            Some(image) => {
                self.replace_and_commit("Paste", image);
                true
            }
            None => false,
        }
    }

    pub fn rotate_image(&mut self, rotation: Rotation) {
        let rotated = transform::rotate(&self.live, rotation);
        self.replace_and_commit(rotation.label(), rotated);
    }

    pub fn flip(&mut self, axis: FlipAxis) {
        let flipped = transform::flip(&self.live, axis);
        self.replace_and_commit(axis.label(), flipped);
    }

    pub fn invert_color(&mut self) {
        let inverted = transform::invert_colors(&self.live);
        self.replace_and_commit("Invert Colors", inverted);
    }

    /// Fill the canvas with the background colour.
    pub fn clear(&mut self) {
        let mut cleared = self.live.clone();
        cleared.fill(BACKGROUND);
        self.replace_and_commit("Clear", cleared);
    }

    /// Resize the drawing surface, keeping content at the top-left.
    pub fn resize_canvas(&mut self, width: u32, height: u32) -> Result<()> {
        let resized = transform::resize_canvas(&self.live, width, height)?;
        self.replace_and_commit("Resize Canvas", resized);
        Ok(())
    }

    fn replace_and_commit(&mut self, label: &str, image: PixelBuffer) {
        self.finish_open_gesture();
        self.live = image;
        self.notify_replaced();
        self.commit(label.to_string());
    }

    /// Store a copy of the live buffer as the newest state.
    fn commit(&mut self, label: String) {
        debug!(session = %self.id, %label, "commit");
        self.history.commit_labeled(label, self.live.clone());
    }

    fn notify_replaced(&mut self) {
        let (w, h) = self.live.dimensions();
        if let Some(display) = self.display.as_mut() {
            display.buffer_replaced(w, h);
        }
    }

    fn notify_changed(&mut self) {
        if let Some(display) = self.display.as_mut() {
            display.buffer_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::BrushStyle;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(u32, u32)>>>);

    impl DisplaySink for Recorder {
        fn buffer_replaced(&mut self, width: u32, height: u32) {
            self.0.lock().unwrap().push((width, height));
        }
    }

    #[test]
    fn drag_produces_exactly_one_commit() {
        let mut s = CanvasSession::new(30, 30, 10).unwrap();
        s.begin_gesture(1, 1);
        for x in 2..20 {
            s.gesture_move(x, 1);
        }
        assert_eq!(s.history().len(), 1);
        assert!(s.end_gesture(20, 1));
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history().current_label(), "Pen Stroke");
        assert_eq!(s.image().get_pixel(10, 1), BLACK);
    }

    #[test]
    fn click_without_drag_still_commits() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        s.brush_mut().set_style(BrushStyle::Move);
        s.begin_gesture(3, 3);
        s.end_gesture(3, 3);
        assert_eq!(s.history().len(), 2);
        assert_eq!(s.history().snapshots().next(), s.history().snapshots().nth(1));
    }

    #[test]
    fn cancelled_gesture_leaves_history_and_restores_canvas() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        let before = s.image().clone();
        s.begin_gesture(2, 2);
        s.gesture_move(8, 8);
        assert_ne!(s.image(), &before);
        assert!(s.cancel_gesture());
        assert_eq!(s.image(), &before);
        assert_eq!(s.history().len(), 1);
        assert!(!s.cancel_gesture());
    }

    #[test]
    fn end_without_begin_is_noop() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        assert!(!s.end_gesture(1, 1));
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn undo_restores_dimensions_and_notifies_display() {
        let mut s = CanvasSession::new(8, 4, 10).unwrap();
        let rec = Recorder::default();
        s.set_display(Box::new(rec.clone()));
        s.rotate_image(Rotation::Deg90);
        assert_eq!(s.image().dimensions(), (4, 8));
        assert!(s.undo());
        assert_eq!(s.image().dimensions(), (8, 4));
        assert!(s.redo());
        assert_eq!(rec.0.lock().unwrap().as_slice(), &[(8, 4), (4, 8), (8, 4), (4, 8)]);
    }

    #[test]
    fn live_edits_never_reach_stored_snapshots() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        s.begin_gesture(5, 5);
        s.end_gesture(5, 5);
        let committed = s.history().current();
        s.begin_gesture(0, 0);
        s.gesture_move(9, 0);
        assert_eq!(s.history().current(), committed);
    }

    #[test]
    fn brush_is_captured_at_gesture_start() {
        let mut s = CanvasSession::new(20, 5, 10).unwrap();
        s.brush_mut().set_size(1);
        s.begin_gesture(0, 2);
        s.brush_mut().set_color(Rgba([255, 0, 0, 255]));
        s.end_gesture(10, 2);
        assert_eq!(s.image().get_pixel(9, 2), BLACK);
    }

    #[test]
    fn atomic_edit_closes_open_gesture_first() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        s.begin_gesture(1, 1);
        s.invert_color();
        assert!(!s.is_gesture_active());
        assert_eq!(s.history().labels(), vec!["Open", "Pen Stroke", "Invert Colors"]);
    }

    #[test]
    fn network_image_is_downscaled() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        let big = PixelBuffer::new_filled(3000, 1200, BLACK).unwrap();
        s.set_network_image(big).unwrap();
        assert_eq!(s.image().dimensions(), (1500, 600));
    }

    #[test]
    fn zero_sized_rgba_is_rejected_without_commit() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        assert!(s.set_new_rgba(&RgbaImage::new(0, 5)).is_err());
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.image().dimensions(), (10, 10));
    }

    #[test]
    fn load_document_restarts_history() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        s.invert_color();
        s.begin_gesture(2, 2);
        s.load_document(PixelBuffer::new_filled(3, 4, BLACK).unwrap());
        assert!(!s.is_gesture_active());
        assert_eq!(s.history().labels(), vec!["Open"]);
        assert_eq!(s.image().dimensions(), (3, 4));
        assert!(!s.undo());
    }

    #[test]
    fn clear_and_resize_commit() {
        let mut s = CanvasSession::new(10, 10, 10).unwrap();
        s.begin_gesture(5, 5);
        s.end_gesture(5, 5);
        s.clear();
        assert_eq!(s.image().get_pixel(5, 5), BACKGROUND);
        s.resize_canvas(20, 5).unwrap();
        assert_eq!(s.image().dimensions(), (20, 5));
        assert!(s.resize_canvas(0, 5).is_err());
        assert_eq!(s.history().len(), 4);
    }
}
