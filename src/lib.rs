//! Raster image editor core: a chunked RGBA canvas, a bounded snapshot
//! history with linear undo/redo, and a canvas session that turns pointer
//! gestures and whole-image edits into exactly one history entry each.

pub mod canvas;
pub mod cli;
pub mod commands;
pub mod components;
pub mod error;
pub mod io;
pub mod logger;
pub mod ops;
pub mod project;
pub mod session;
pub mod settings;

pub use canvas::PixelBuffer;
pub use commands::EditorCommand;
pub use components::history::History;
pub use components::tools::{BrushConfig, BrushStyle};
pub use error::{EditorError, Result};
pub use session::{CanvasSession, DisplaySink};
pub use settings::EditorSettings;
