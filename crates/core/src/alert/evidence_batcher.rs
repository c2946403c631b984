use std::time::{Duration, Instant};

use crate::alert::domain::notifier::Notifier;
use crate::alert::evidence::{EvidenceBatch, EvidenceItem};
use crate::shared::constants::DEFAULT_BATCH_WINDOW_SECS;

pub const DEFAULT_BATCH_WINDOW: Duration = Duration::from_secs(DEFAULT_BATCH_WINDOW_SECS);

/// Result of one batcher tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The window is still open.
    Pending,
    /// The window elapsed with nothing to send; it restarted.
    WindowRestarted,
    Sent { items: usize },
    /// Every attempt failed. The items are gone.
    Dropped { items: usize },
}

/// Collects evidence and sends at most one notification per window.
///
/// The batch is emptied on every flush whether or not delivery worked.
pub struct EvidenceBatcher {
    notifier: Box<dyn Notifier>,
    window: Duration,
    max_attempts: u32,
    batch: EvidenceBatch,
    window_start: Instant,
}

impl EvidenceBatcher {
    pub fn new(notifier: Box<dyn Notifier>, window: Duration, started_at: Instant) -> Self {
        Self {
            notifier,
            window,
            max_attempts: 1,
            batch: EvidenceBatch::new(),
            window_start: started_at,
        }
    }

    /// Immediate delivery attempts per flush (at least one).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn append(&mut self, item: EvidenceItem) {
        self.batch.push(item);
    }

    pub fn tick(&mut self, now: Instant) -> FlushOutcome {
        if now.saturating_duration_since(self.window_start) < self.window {
            return FlushOutcome::Pending;
        }
        self.window_start = now;

        let batch = self.batch.take();
        if batch.is_empty() {
            return FlushOutcome::WindowRestarted;
        }

        let items = batch.len();
        let notification = batch.to_notification();
        for attempt in 1..=self.max_attempts {
            match self.notifier.notify(&notification) {
                Ok(()) => {
                    log::info!("Sent batch of {items} detection(s)");
                    return FlushOutcome::Sent { items };
                }
                Err(e) => log::warn!(
                    "Notification attempt {attempt}/{} failed: {e}",
                    self.max_attempts
                ),
            }
        }
        log::warn!("Dropping batch of {items} detection(s) after failed delivery");
        FlushOutcome::Dropped { items }
    }
}
