use thiserror::Error;

/// Everything that can go wrong at the edges of the editor core.
///
/// History exhaustion (undo at the oldest entry, redo at the newest) is not
/// an error and never shows up here; those calls return `None`.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("image has zero area ({width}×{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("image dimensions {width}×{height} exceed the 256 megapixel limit")]
    TooLarge { width: u32, height: u32 },

    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("invalid image URL: {0}")]
    InvalidUrl(String),

    #[error("remote image fetch failed: {0}")]
    Fetch(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("project has no file path")]
    NoPath,
}

pub type Result<T> = std::result::Result<T, EditorError>;
