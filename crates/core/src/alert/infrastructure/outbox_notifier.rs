use std::path::{Path, PathBuf};

use chrono::Local;

use crate::alert::domain::notifier::{Notification, Notifier};
use crate::alert::infrastructure::notify_error::NotifyError;

pub const MESSAGE_FILE_NAME: &str = "message.txt";

/// Drops every batch into its own directory under `root`: a
/// `message.txt` with subject and body, plus the attachments as files.
///
/// Meant for a mail relay or sync tool picking up the directory.
pub struct OutboxNotifier {
    root: PathBuf,
}

impl OutboxNotifier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free `batch_<timestamp>[_n]` directory name.
    fn batch_dir(&self) -> PathBuf {
        let stem = format!("batch_{}", Local::now().format("%Y-%m-%d_%H-%M-%S-%3f"));
        let mut dir = self.root.join(&stem);
        let mut n = 1;
        while dir.exists() {
            dir = self.root.join(format!("{stem}_{n}"));
            n += 1;
        }
        dir
    }
}

fn write(path: &Path, contents: &[u8]) -> Result<(), NotifyError> {
    std::fs::write(path, contents).map_err(|source| NotifyError::Outbox {
        path: path.to_path_buf(),
        source,
    })
}

impl Notifier for OutboxNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        let dir = self.batch_dir();
        std::fs::create_dir_all(&dir).map_err(|source| NotifyError::Outbox {
            path: dir.clone(),
            source,
        })?;

        let message = format!("Subject: {}\n\n{}\n", notification.subject, notification.body);
        write(&dir.join(MESSAGE_FILE_NAME), message.as_bytes())?;

        for attachment in &notification.attachments {
            // Only the file name is kept so an attachment cannot escape the batch directory.
            let name = Path::new(&attachment.filename)
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "attachment".into());
            write(&dir.join(name), &attachment.bytes)?;
        }

        log::debug!("Wrote batch to {}", dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::domain::notifier::Attachment;

    fn notification() -> Notification {
        Notification {
            subject: "Batched person detections".into(),
            body: "Detections in the last minute:\n- 2024-01-01 10:00:00 (a.jpg)".into(),
            attachments: vec![
                Attachment::new("a.jpg", vec![1, 2, 3]),
                Attachment::new("b.jpg", Vec::new()),
            ],
        }
    }

    fn batch_dirs(root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = std::fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        dirs.sort();
        dirs
    }

    #[test]
    fn test_writes_message_and_attachments() {
        let root = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(root.path());
        notifier.notify(&notification()).unwrap();

        let dirs = batch_dirs(root.path());
        assert_eq!(dirs.len(), 1);
        let message = std::fs::read_to_string(dirs[0].join(MESSAGE_FILE_NAME)).unwrap();
        assert!(message.starts_with("Subject: Batched person detections"));
        assert!(message.contains("- 2024-01-01 10:00:00 (a.jpg)"));
        assert_eq!(std::fs::read(dirs[0].join("a.jpg")).unwrap(), vec![1, 2, 3]);
        assert!(std::fs::read(dirs[0].join("b.jpg")).unwrap().is_empty());
    }

    #[test]
    fn test_consecutive_batches_get_separate_directories() {
        let root = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(root.path());
        notifier.notify(&notification()).unwrap();
        notifier.notify(&Notification::default()).unwrap();
        assert_eq!(batch_dirs(root.path()).len(), 2);
    }

    #[test]
    fn test_attachment_path_is_flattened() {
        let root = tempfile::tempdir().unwrap();
        let notifier = OutboxNotifier::new(root.path());
        let notification = Notification {
            attachments: vec![Attachment::new("../../escape.jpg", vec![9])],
            ..Notification::default()
        };
        notifier.notify(&notification).unwrap();
        let dirs = batch_dirs(root.path());
        assert!(dirs[0].join("escape.jpg").exists());
    }

    #[test]
    fn test_unwritable_root_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("not_a_dir");
        std::fs::write(&file, b"x").unwrap();
        let notifier = OutboxNotifier::new(&file);
        assert!(notifier.notify(&Notification::default()).is_err());
    }
}
