use std::path::PathBuf;

use tracing::{debug, warn};

use crate::components::history::DEFAULT_CAPACITY;
use crate::error::Result;

const SETTINGS_FILE: &str = "rasterpad_settings.cfg";

/// Persisted editor preferences.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorSettings {
    /// Number of canvas states kept for undo.
    pub history_capacity: usize,
    /// Snapshot storage cap in MiB. 0 means unlimited.
    pub history_memory_mb: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub brush_size: u32,
    pub brush_opacity: u8,
    /// Remote images are halved until strictly smaller than this.
    pub fetch_max_width: u32,
    pub fetch_max_height: u32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            history_memory_mb: 512,
            canvas_width: 800,
            canvas_height: 600,
            brush_size: 2,
            brush_opacity: 100,
            fetch_max_width: 1920,
            fetch_max_height: 1080,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/rasterpad/rasterpad_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\RasterPad\rasterpad_settings.cfg
    /// On macOS:   ~/Library/Application Support/RasterPad/rasterpad_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("rasterpad");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("RasterPad").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("RasterPad")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Snapshot storage cap in bytes, `None` when unlimited.
    pub fn history_memory_budget(&self) -> Option<usize> {
        match self.history_memory_mb {
            0 => None,
            mb => Some(mb.saturating_mul(1024 * 1024)),
        }
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "loaded settings");
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::settings_path() else { return Ok(()) };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_config_string())?;
        debug!(path = %path.display(), "saved settings");
        Ok(())
    }

    /// Parse `key=value` lines. Unknown keys are ignored; bad values keep the default.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "history_capacity" => parse_into(key, val, &mut s.history_capacity),
                "history_memory_mb" => parse_into(key, val, &mut s.history_memory_mb),
                "canvas_width" => parse_into(key, val, &mut s.canvas_width),
                "canvas_height" => parse_into(key, val, &mut s.canvas_height),
                "brush_size" => parse_into(key, val, &mut s.brush_size),
                "brush_opacity" => parse_into(key, val, &mut s.brush_opacity),
                "fetch_max_width" => parse_into(key, val, &mut s.fetch_max_width),
                "fetch_max_height" => parse_into(key, val, &mut s.fetch_max_height),
                _ => {}
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "history_capacity={}\n\
             history_memory_mb={}\n\
             canvas_width={}\n\
             canvas_height={}\n\
             brush_size={}\n\
             brush_opacity={}\n\
             fetch_max_width={}\n\
             fetch_max_height={}\n",
            self.history_capacity,
            self.history_memory_mb,
            self.canvas_width,
            self.canvas_height,
            self.brush_size,
            self.brush_opacity,
            self.fetch_max_width,
            self.fetch_max_height,
        )
    }
}

fn parse_into<T: std::str::FromStr>(key: &str, val: &str, slot: &mut T) {
    match val.parse() {
        Ok(v) => *slot = v,
        Err(_) => warn!(key, value = val, "ignoring invalid setting"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_fresh_editor() {
        let s = EditorSettings::default();
        assert_eq!(s.history_capacity, 20);
        assert_eq!((s.canvas_width, s.canvas_height), (800, 600));
        assert_eq!((s.brush_size, s.brush_opacity), (2, 100));
        assert_eq!(s.history_memory_budget(), Some(512 * 1024 * 1024));
    }

    #[test]
    fn config_string_reads_back() {
        let s = EditorSettings {
            history_capacity: 7,
            history_memory_mb: 0,
            canvas_width: 320,
            brush_opacity: 40,
            ..Default::default()
        };
        let back = EditorSettings::parse(&s.to_config_string());
        assert_eq!(back, s);
        assert_eq!(back.history_memory_budget(), None);
    }

    #[test]
    fn bad_lines_fall_back_to_defaults() {
        let s = EditorSettings::parse("garbage\nbrush_size=huge\ncanvas_height = 90 \nunknown=1\n");
        assert_eq!(s.brush_size, 2);
        assert_eq!(s.canvas_height, 90);
        assert_eq!(s.history_capacity, 20);
    }
}
