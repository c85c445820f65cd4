// ============================================================================
// CLIPBOARD - image paste sources and OS clipboard copy
// ============================================================================

use std::borrow::Cow;
use std::path::Path;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::canvas::PixelBuffer;
use crate::error::{EditorError, Result};

/// Anything a session can paste an image from.
pub trait ClipboardSource {
    /// The image currently on offer, or `None` when there is nothing usable.
    fn read_image(&mut self) -> Option<PixelBuffer>;
}

// ---------------------------------------------------------------------------
//  In-process clipboard
// ---------------------------------------------------------------------------

/// Clipboard that lives inside the process. Keeps full transparency and
/// works without a display server.
#[derive(Clone, Debug, Default)]
pub struct MemoryClipboard {
    image: Option<PixelBuffer>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_image(&mut self, image: PixelBuffer) {
        self.image = Some(image);
    }

    pub fn clear(&mut self) {
        self.image = None;
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read_image(&mut self) -> Option<PixelBuffer> {
        self.image.clone()
    }
}

// ---------------------------------------------------------------------------
//  System clipboard (arboard)
// ---------------------------------------------------------------------------

/// The OS clipboard.
///
/// Raw image data wins; otherwise clipboard text naming an image file on disk
/// is opened.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self> {
        let inner = arboard::Clipboard::new().map_err(|e| EditorError::Clipboard(e.to_string()))?;
        Ok(Self { inner })
    }

    fn read_raw_image(&mut self) -> Option<RgbaImage> {
        let data = self.inner.get_image().ok()?;
        RgbaImage::from_raw(data.width as u32, data.height as u32, data.bytes.into_owned())
    }

    fn read_image_path(&mut self) -> Option<RgbaImage> {
        let text = self.inner.get_text().ok()?;
        let path = Path::new(text.trim());
        if !path.is_file() {
            return None;
        }
        match image::open(path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "clipboard text is not an image file");
                None
            }
        }
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_image(&mut self) -> Option<PixelBuffer> {
        let img = self.read_raw_image().or_else(|| self.read_image_path())?;
        match PixelBuffer::from_rgba_image(&img) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                warn!(error = %e, "ignoring clipboard image");
                None
            }
        }
    }
}

/// Write `image` to the OS clipboard.
pub fn copy_image(image: &PixelBuffer) -> Result<()> {
    let flat = image.to_rgba_image();
    let data = arboard::ImageData {
        width: flat.width() as usize,
        height: flat.height() as usize,
        bytes: Cow::Borrowed(flat.as_raw()),
    };
    let mut clip = arboard::Clipboard::new().map_err(|e| EditorError::Clipboard(e.to_string()))?;
    clip.set_image(data).map_err(|e| EditorError::Clipboard(e.to_string()))?;
    debug!(width = flat.width(), height = flat.height(), "copied image to system clipboard");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::BACKGROUND;

    #[test]
    fn memory_clipboard_offers_last_image() {
        let mut clip = MemoryClipboard::new();
        assert!(clip.read_image().is_none());
        let img = PixelBuffer::new_filled(3, 2, BACKGROUND).unwrap();
        clip.set_image(img.clone());
        assert_eq!(clip.read_image(), Some(img));
        assert!(clip.has_image());
        clip.clear();
        assert!(clip.read_image().is_none());
    }
}
