use image::Rgba;
use rasterpad::canvas::BACKGROUND;
use rasterpad::ops::clipboard::MemoryClipboard;
use rasterpad::ops::transform::{FlipAxis, Rotation};
use rasterpad::{BrushStyle, CanvasSession, EditorCommand, EditorSettings, PixelBuffer};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn session(w: u32, h: u32) -> CanvasSession {
    CanvasSession::new(w, h, 20).unwrap()
}

#[test]
fn settings_drive_a_fresh_session() {
    let settings = EditorSettings::default();
    let s = CanvasSession::from_settings(&settings).unwrap();
    assert_eq!(s.image().dimensions(), (800, 600));
    assert_eq!(s.image().get_pixel(0, 0), BACKGROUND);
    assert_eq!(s.history().capacity(), 20);
    assert_eq!(s.brush().size(), 2);
    assert_eq!(s.brush().opacity(), 100);
}

#[test]
fn strokes_then_undo_walk_back_one_gesture_at_a_time() {
    let mut s = session(40, 40);
    let blank = s.image().clone();

    s.begin_gesture(5, 5);
    s.gesture_move(15, 5);
    s.end_gesture(25, 5);
    let first = s.image().clone();

    s.brush_mut().set_style(BrushStyle::Rectangle);
    s.begin_gesture(2, 20);
    s.gesture_move(10, 30);
    s.end_gesture(12, 35);

    assert_eq!(s.history().len(), 3);
    assert!(s.undo());
    assert_eq!(s.image(), &first);
    assert!(s.undo());
    assert_eq!(s.image(), &blank);
    assert!(!s.undo());
}

#[test]
fn rubber_band_shape_shows_only_final_extent() {
    let mut s = session(30, 30);
    s.brush_mut().set_style(BrushStyle::Rectangle);
    s.begin_gesture(0, 0);
    s.gesture_move(25, 25);
    s.end_gesture(5, 5);
    assert_eq!(s.image().get_pixel(25, 25), BACKGROUND);
    assert_eq!(s.image().get_pixel(5, 0), BLACK);
}

#[test]
fn half_opacity_pen_blends_once_per_stroke() {
    let mut s = session(20, 5);
    s.brush_mut().set_size(3);
    s.brush_mut().set_opacity(50);
    s.begin_gesture(2, 2);
    s.gesture_move(3, 2);
    s.gesture_move(2, 2);
    s.end_gesture(3, 2);
    let px = s.image().get_pixel(2, 2);
    assert!((120..=135).contains(&px[0]), "got {px:?}");
}

#[test]
fn bucket_fill_stops_at_boundaries() {
    let mut s = session(10, 10);
    s.brush_mut().set_size(1);
    s.brush_mut().set_style(BrushStyle::Line);
    s.begin_gesture(5, 0);
    s.end_gesture(5, 9);

    s.brush_mut().set_style(BrushStyle::PaintBucket);
    s.brush_mut().set_color(Rgba([255, 0, 0, 255]));
    s.begin_gesture(1, 1);
    s.end_gesture(1, 1);

    assert_eq!(s.image().get_pixel(0, 9), Rgba([255, 0, 0, 255]));
    assert_eq!(s.image().get_pixel(5, 4), BLACK);
    assert_eq!(s.image().get_pixel(8, 4), BACKGROUND);
    assert_eq!(s.history().current_label(), "Paint Bucket");
}

#[test]
fn transforms_are_undoable_and_exact() {
    let mut s = session(7, 3);
    s.begin_gesture(0, 0);
    s.end_gesture(0, 0);
    let marked = s.image().clone();

    for _ in 0..4 {
        s.rotate_image(Rotation::Deg90);
    }
    assert_eq!(s.image(), &marked);

    s.flip(FlipAxis::Horizontal);
    assert_eq!(s.image().get_pixel(6, 0), marked.get_pixel(0, 0));
    s.invert_color();
    assert!(s.undo());
    assert!(s.undo());
    assert_eq!(s.image(), &marked);
    assert_eq!(s.history().redo_count(), 2);
}

#[test]
fn paste_only_commits_when_clipboard_has_an_image() {
    let mut s = session(4, 4);
    let mut clip = MemoryClipboard::new();
    assert!(!s.paste(&mut clip));
    assert_eq!(s.history().len(), 1);

    let pasted = PixelBuffer::new_filled(9, 2, BLACK).unwrap();
    clip.set_image(pasted.clone());
    assert!(s.paste(&mut clip));
    assert_eq!(s.image(), &pasted);
    assert_eq!(s.history().current_label(), "Paste");
}

#[test]
fn capacity_bounds_session_history() {
    let mut s = CanvasSession::new(3, 3, 3).unwrap();
    for _ in 0..10 {
        s.execute(EditorCommand::Invert).unwrap();
    }
    assert_eq!(s.history().len(), 3);
    assert!(s.undo());
    assert!(s.undo());
    assert!(!s.undo());
}

#[test]
fn eraser_restores_background() {
    let mut s = session(10, 3);
    s.begin_gesture(0, 1);
    s.end_gesture(9, 1);
    s.brush_mut().set_style(BrushStyle::Eraser);
    s.brush_mut().set_size(4);
    s.begin_gesture(0, 1);
    s.end_gesture(9, 1);
    assert_eq!(s.image().get_pixel(4, 1), BACKGROUND);
}
