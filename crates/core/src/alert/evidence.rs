use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::alert::domain::notifier::{Attachment, Notification};
use crate::snapshot::snapshot_recorder::snapshot_file_name;

pub const BATCH_SUBJECT: &str = "Batched person detections";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One fired alert: when it happened and the snapshot taken at that moment,
/// if the snapshot could be written.
#[derive(Clone, Debug, PartialEq)]
pub struct EvidenceItem {
    pub timestamp: DateTime<Local>,
    pub snapshot: Option<PathBuf>,
}

impl EvidenceItem {
    pub fn new(timestamp: DateTime<Local>, snapshot: Option<PathBuf>) -> Self {
        Self { timestamp, snapshot }
    }

    fn snapshot_name(&self) -> Option<String> {
        self.snapshot
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Evidence gathered since the last flush, oldest first.
#[derive(Clone, Debug, Default)]
pub struct EvidenceBatch {
    items: Vec<EvidenceItem>,
}

impl EvidenceBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: EvidenceItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// Empties the batch, handing back everything it held.
    pub fn take(&mut self) -> EvidenceBatch {
        std::mem::take(self)
    }

    /// Builds the batched notification.
    ///
    /// Every item gets an attachment. A snapshot that was never written, or
    /// cannot be read back, is attached with empty content under the name it
    /// would have had.
    pub fn to_notification(&self) -> Notification {
        let mut body = String::from("Detections in the last minute:");
        let mut attachments = Vec::new();

        for item in &self.items {
            let when = item.timestamp.format(TIMESTAMP_FORMAT);
            match (&item.snapshot, item.snapshot_name()) {
                (Some(path), Some(name)) => {
                    body.push_str(&format!("\n- {when} ({name})"));
                    let bytes = std::fs::read(path).unwrap_or_else(|e| {
                        log::warn!("Snapshot {} unreadable: {e}", path.display());
                        Vec::new()
                    });
                    attachments.push(Attachment::new(name, bytes));
                }
                _ => {
                    body.push_str(&format!("\n- {when} (no snapshot)"));
                    attachments.push(Attachment::new(
                        snapshot_file_name(&item.timestamp),
                        Vec::new(),
                    ));
                }
            }
        }

        Notification {
            subject: BATCH_SUBJECT.to_string(),
            body,
            attachments,
        }
    }
}
