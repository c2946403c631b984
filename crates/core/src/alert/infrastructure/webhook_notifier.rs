use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;

use crate::alert::domain::notifier::{Notification, Notifier};
use crate::alert::infrastructure::notify_error::NotifyError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts each batch as a `multipart/form-data` request.
///
/// Fields: `subject`, `body`, and one `attachment` file part per evidence
/// item.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(notification: &Notification) -> Result<Form, NotifyError> {
        let mut form = Form::new()
            .text("subject", notification.subject.clone())
            .text("body", notification.body.clone());
        for attachment in &notification.attachments {
            let part = Part::bytes(attachment.bytes.clone())
                .file_name(attachment.filename.clone())
                .mime_str(mime_for(&attachment.filename))
                .map_err(|source| NotifyError::Attachment {
                    filename: attachment.filename.clone(),
                    source,
                })?;
            form = form.part("attachment", part);
        }
        Ok(form)
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), Box<dyn std::error::Error>> {
        let form = Self::form(notification)?;
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .map_err(|source| NotifyError::Transport {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }
        log::debug!("Webhook {} accepted batch ({status})", self.url);
        Ok(())
    }
}

fn mime_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".png") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::domain::notifier::Attachment;
    use rstest::rstest;

    #[rstest]
    #[case("snapshot_1.jpg", "image/jpeg")]
    #[case("SNAP.JPEG", "image/jpeg")]
    #[case("frame.png", "image/png")]
    #[case("notes", "application/octet-stream")]
    fn test_mime_for(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(mime_for(name), expected);
    }

    #[test]
    fn test_form_accepts_empty_attachment() {
        let notification = Notification {
            subject: "s".into(),
            body: "b".into(),
            attachments: vec![Attachment::new("missing.jpg", Vec::new())],
        };
        assert!(WebhookNotifier::form(&notification).is_ok());
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        // Port 9 on loopback is the discard service; nothing listens there in CI.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        assert_eq!(notifier.url(), "http://127.0.0.1:9/hook");
        assert!(notifier.notify(&Notification::default()).is_err());
    }
}
