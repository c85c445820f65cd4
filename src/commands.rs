use std::str::FromStr;

use image::Rgba;

use crate::canvas::PixelBuffer;
use crate::components::tools::BrushStyle;
use crate::error::{EditorError, Result};
use crate::ops::transform::{FlipAxis, Rotation};
use crate::session::CanvasSession;

/// Every discrete action a front end can ask a session to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    Undo,
    Redo,
    Clear,
    Rotate(Rotation),
    Flip(FlipAxis),
    Invert,
    ResizeCanvas { width: u32, height: u32 },
    SetBrushSize(u32),
    SetBrushOpacity(u8),
    SetBrushColor(Rgba<u8>),
    SetBrushStyle(BrushStyle),
    SetFullFill(bool),
    SetImage(PixelBuffer),
}

impl EditorCommand {
    /// Whether this command can change pixels (as opposed to brush state).
    pub fn edits_canvas(&self) -> bool {
        !matches!(
            self,
            EditorCommand::SetBrushSize(_)
                | EditorCommand::SetBrushOpacity(_)
                | EditorCommand::SetBrushColor(_)
                | EditorCommand::SetBrushStyle(_)
                | EditorCommand::SetFullFill(_)
        )
    }
}

impl FromStr for EditorCommand {
    type Err = EditorError;

    /// Parse a batch-mode token such as `rotate90`, `flip-h` or `resize=640x480`.
    fn from_str(token: &str) -> Result<Self> {
        let token = token.trim().to_ascii_lowercase();
        let cmd = match token.as_str() {
            "undo" => EditorCommand::Undo,
            "redo" => EditorCommand::Redo,
            "clear" => EditorCommand::Clear,
            "invert" => EditorCommand::Invert,
            "flip-h" => EditorCommand::Flip(FlipAxis::Horizontal),
            "flip-v" => EditorCommand::Flip(FlipAxis::Vertical),
            other => {
                if let Some(deg) = other.strip_prefix("rotate") {
                    let rotation = deg
                        .parse()
                        .ok()
                        .and_then(Rotation::from_degrees)
                        .ok_or_else(|| EditorError::InvalidCommand(format!("rotation must be 90, 180 or 270: {other}")))?;
                    EditorCommand::Rotate(rotation)
                } else if let Some(size) = other.strip_prefix("resize=") {
                    let (width, height) = parse_size(size)
                        .ok_or_else(|| EditorError::InvalidCommand(format!("expected resize=WxH: {other}")))?;
                    EditorCommand::ResizeCanvas { width, height }
                } else {
                    return Err(EditorError::InvalidCommand(other.to_string()));
                }
            }
        };
        Ok(cmd)
    }
}

/// Parse a comma-separated list of command tokens. Empty items are skipped.
pub fn parse_command_list(list: &str) -> Result<Vec<EditorCommand>> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

fn parse_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}

impl CanvasSession {
    /// Run `cmd`. Returns whether the canvas changed.
    pub fn execute(&mut self, cmd: EditorCommand) -> Result<bool> {
        let changed = match cmd {
            EditorCommand::Undo => self.undo(),
            EditorCommand::Redo => self.redo(),
            EditorCommand::Clear => {
                self.clear();
                true
            }
            EditorCommand::Rotate(rotation) => {
                self.rotate_image(rotation);
                true
            }
            EditorCommand::Flip(axis) => {
                self.flip(axis);
                true
            }
            EditorCommand::Invert => {
                self.invert_color();
                true
            }
            EditorCommand::ResizeCanvas { width, height } => {
                self.resize_canvas(width, height)?;
                true
            }
            EditorCommand::SetImage(image) => {
                self.set_new_image(image);
                true
            }
            EditorCommand::SetBrushSize(size) => {
                self.brush_mut().set_size(size);
                false
            }
            EditorCommand::SetBrushOpacity(opacity) => {
                self.brush_mut().set_opacity(opacity);
                false
            }
            EditorCommand::SetBrushColor(color) => {
                self.brush_mut().set_color(color);
                false
            }
            EditorCommand::SetBrushStyle(style) => {
                self.brush_mut().set_style(style);
                false
            }
            EditorCommand::SetFullFill(full) => {
                self.brush_mut().set_full_fill(full);
                false
            }
        };
        Ok(changed)
    }
}
