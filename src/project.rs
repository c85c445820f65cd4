use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::commands::EditorCommand;
use crate::error::{EditorError, Result};
use crate::io::{self, SaveFormat};
use crate::session::CanvasSession;
use crate::settings::EditorSettings;

/// Single open document.
pub struct Project {
    pub id: Uuid,
    pub session: CanvasSession,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, settings: &EditorSettings) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            session: CanvasSession::from_settings(settings)?,
            path: None,
            is_dirty: false,
            name: format!("Untitled-{}", untitled_counter),
        })
    }

    /// Open an image file as a new document.
    pub fn open(path: &Path, settings: &EditorSettings) -> Result<Self> {
        let image = io::load_image(path)?;
        let session = CanvasSession::from_image(image, settings.history_capacity).configured(settings);
        Ok(Self {
            id: Uuid::new_v4(),
            session,
            path: Some(path.to_path_buf()),
            is_dirty: false,
            name: name_from_path(path),
        })
    }

    /// Run a command against the document's session, marking it dirty when
    /// pixels changed.
    pub fn execute(&mut self, cmd: EditorCommand) -> Result<bool> {
        let changed = self.session.execute(cmd)?;
        if changed {
            self.mark_dirty();
        }
        Ok(changed)
    }

    /// Write back to the current path.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self.path.clone().ok_or(EditorError::NoPath)?;
        self.save_as(&path, None)
    }

    /// Write to `path` and adopt it as the document's path.
    pub fn save_as(&mut self, path: &Path, format: Option<SaveFormat>) -> Result<PathBuf> {
        let written = io::save_image(self.session.image(), path, format)?;
        self.path = Some(written.clone());
        self.update_name_from_path();
        self.mark_clean();
        Ok(written)
    }

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = name_from_path(path);
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

fn name_from_path(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
