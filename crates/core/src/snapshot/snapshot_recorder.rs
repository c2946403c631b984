use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::shared::constants::SNAPSHOT_EXTENSION;
use crate::shared::frame::Frame;
use crate::snapshot::domain::image_writer::ImageWriter;

/// `snapshot_2024-03-01_10-00-00-123.jpg`
pub fn snapshot_file_name(at: &DateTime<Local>) -> String {
    format!(
        "snapshot_{}.{SNAPSHOT_EXTENSION}",
        at.format("%Y-%m-%d_%H-%M-%S-%3f")
    )
}

/// Saves evidence images into one directory.
pub struct SnapshotRecorder {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
}

impl SnapshotRecorder {
    pub fn new(writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `frame` and returns its path, or `None` if the write failed.
    /// A failure is logged and otherwise ignored.
    pub fn record(&self, frame: &Frame, at: &DateTime<Local>) -> Option<PathBuf> {
        let path = self.dir.join(snapshot_file_name(at));
        match self.writer.write(&path, frame) {
            Ok(()) => {
                log::debug!("Saved snapshot {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("Failed to save snapshot {}: {e}", path.display());
                None
            }
        }
    }
}
