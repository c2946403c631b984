pub mod log_notifier;
pub mod notify_error;
pub mod outbox_notifier;
pub mod webhook_notifier;
