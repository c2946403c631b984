use crate::alert::domain::notifier::{Notification, Notifier};

/// Writes each batch to the log instead of sending it anywhere.
///
/// Default transport when no webhook or outbox is configured.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("{}\n{}", notification.subject, notification.body);
        for attachment in &notification.attachments {
            log::info!(
                "  attachment {} ({} bytes)",
                attachment.filename,
                attachment.bytes.len()
            );
        }
        Ok(())
    }
}
