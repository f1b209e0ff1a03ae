//! Numbered PNG frame export.
//!
//! While saving is on, every rendered frame is written as `<dir>/<n>.png`
//! with `n` counting up from 1. Toggling saving never touches simulation
//! state.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use log::debug;

use crate::error::ExportError;

/// Writes rendered frames to disk on demand.
#[derive(Debug)]
pub struct FrameExporter {
    dir: PathBuf,
    saving: bool,
    next: u64,
}

impl FrameExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            saving: false,
            next: 1,
        }
    }

    pub fn with_saving(mut self, saving: bool) -> Self {
        self.saving = saving;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    /// Flip the saving flag. Returns the new state.
    pub fn toggle_saving(&mut self) -> bool {
        self.saving = !self.saving;
        debug!("Frame saving {}", if self.saving { "on" } else { "off" });
        self.saving
    }

    /// Number the next saved frame will get.
    pub fn next_index(&self) -> u64 {
        self.next
    }

    /// Path of frame `n`.
    pub fn frame_path(&self, n: u64) -> PathBuf {
        self.dir.join(format!("{}.png", n))
    }

    /// Write `frame` if saving is on. Returns the written path.
    pub fn save(&mut self, frame: &RgbaImage) -> Result<Option<PathBuf>, ExportError> {
        if !self.saving {
            return Ok(None);
        }
        if !self.dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let path = self.frame_path(self.next);
        frame.save(&path)?;
        self.next += 1;
        Ok(Some(path))
    }
}
