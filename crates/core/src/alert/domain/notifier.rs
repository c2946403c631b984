/// A file sent along with a notification.
///
/// `bytes` may be empty when the snapshot behind it could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<Attachment>,
}

/// Delivers a batched alert to whoever is watching.
///
/// Implementations must accept zero attachments and attachments with empty
/// content.
pub trait Notifier: Send {
    fn notify(&self, notification: &Notification) -> Result<(), Box<dyn std::error::Error>>;
}
