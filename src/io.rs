use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use tracing::info;

use crate::canvas::PixelBuffer;
use crate::error::{EditorError, Result};

/// JPEG quality used when nothing else is asked for.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    pub fn all() -> &'static [SaveFormat] {
        &[SaveFormat::Png, SaveFormat::Jpeg, SaveFormat::Bmp, SaveFormat::Tga]
    }

    /// Match a format name or file extension, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    /// Infer from the path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_name)
    }

    /// Whether the encoded file keeps the alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, SaveFormat::Jpeg)
    }
}

/// Open an image file from disk.
pub fn load_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)?.to_rgba8();
    info!(path = %path.display(), width = img.width(), height = img.height(), "loaded image");
    PixelBuffer::from_rgba_image(&img)
}

/// Decode an in-memory encoded image (PNG, JPEG, ...), e.g. a network download.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<PixelBuffer> {
    let img = image::load_from_memory(bytes)?.to_rgba8();
    PixelBuffer::from_rgba_image(&img)
}

/// The path a save to `path` actually writes: a name without an extension
/// gets the format's extension appended (`.png` by default).
pub fn resolve_save_path(path: &Path, format: Option<SaveFormat>) -> PathBuf {
    if path.extension().is_some() {
        return path.to_path_buf();
    }
    let ext = format.unwrap_or_default().extension();
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Encode `image` and write it to disk. With no explicit `format` the
/// extension decides. Returns the path written.
pub fn save_image(image: &PixelBuffer, path: &Path, format: Option<SaveFormat>) -> Result<PathBuf> {
    let target = resolve_save_path(path, format);
    let format = match format {
        Some(f) => f,
        None => SaveFormat::from_path(&target).ok_or_else(|| {
            EditorError::UnsupportedFormat(
                target
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?,
    };

    encode_and_write(&image.to_rgba_image(), &target, format, DEFAULT_JPEG_QUALITY)?;
    info!(path = %target.display(), ?format, "saved image");
    Ok(target)
}

/// Encode and write a flat image to a file.
pub fn encode_and_write(image: &RgbaImage, path: &Path, format: SaveFormat, quality: u8) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let (w, h) = image.dimensions();

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(rgb_image.as_raw(), w, h, ColorType::Rgb8)?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
        SaveFormat::Tga => {
            TgaEncoder::new(&mut writer).encode(image.as_raw(), w, h, ColorType::Rgba8)?;
        }
    }
    Ok(())
}
