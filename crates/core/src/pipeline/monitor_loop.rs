use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};

use crate::capture::frame_source::FrameSource;
use crate::control::control_surface::{ControlEffect, ControlEvent, ControlSurface};
use crate::pipeline::monitor_pipeline::MonitorPipeline;
use crate::pipeline::monitor_status::MonitorStatus;
use crate::preferences::preferences::Preferences;

/// Sleep when the source has nothing new, so waiting does not spin a core.
pub const DEFAULT_IDLE_DELAY: Duration = Duration::from_millis(5);

/// Summary handed back once the loop has shut down.
#[derive(Clone, Debug)]
pub struct MonitorOutcome {
    pub ticks: u64,
    pub preferences: Preferences,
    pub status: MonitorStatus,
}

/// The cooperative main loop: newest frame through the pipeline, then at
/// most one control event, until quit is requested.
pub struct MonitorLoop {
    source: FrameSource,
    pipeline: MonitorPipeline,
    control: Arc<ControlSurface>,
    events: Receiver<ControlEvent>,
    preferences_path: Option<PathBuf>,
    idle_delay: Duration,
}

impl MonitorLoop {
    pub fn new(
        source: FrameSource,
        pipeline: MonitorPipeline,
        control: Arc<ControlSurface>,
        events: Receiver<ControlEvent>,
    ) -> Self {
        Self {
            source,
            pipeline,
            control,
            events,
            preferences_path: None,
            idle_delay: DEFAULT_IDLE_DELAY,
        }
    }

    /// Where preferences are written on shutdown. Without one nothing is
    /// persisted.
    pub fn with_preferences_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preferences_path = Some(path.into());
        self
    }

    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    pub fn run(mut self) -> MonitorOutcome {
        let mut last_sequence = None;
        let mut ticks = 0u64;
        let mut last_status = self.pipeline.status().text();

        self.pipeline.logger_mut().info("Monitoring started");

        while !self.control.flags().quit_requested() {
            let now = Instant::now();
            let fresh = self
                .source
                .latest()
                .filter(|frame| Some(frame.sequence()) != last_sequence);

            let idle = match fresh {
                Some(frame) => {
                    last_sequence = Some(frame.sequence());
                    let region = self.control.roi().get();
                    self.pipeline.tick(&frame, region, now);
                    ticks += 1;
                    false
                }
                None => {
                    self.pipeline.poll_batcher(now);
                    true
                }
            };

            match self.events.try_recv() {
                Ok(event) => self.handle(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            let status = self.pipeline.status().text();
            if status != last_status {
                log::info!("Status: {}", self.pipeline.status());
                last_status = status;
            }

            if idle {
                thread::sleep(self.idle_delay);
            }
        }

        self.shutdown(ticks)
    }

    fn handle(&mut self, event: ControlEvent) {
        match self.control.apply(event) {
            ControlEffect::RegionCleared => self.pipeline.status_mut().roi_reset(),
            ControlEffect::CountReset => {
                self.pipeline.status_mut().reset_count();
                log::info!("Detection count reset");
            }
            ControlEffect::Quit => log::info!("Quit requested"),
            ControlEffect::None
            | ControlEffect::RegionChanged(_)
            | ControlEffect::FullscreenChanged(_) => {}
        }
    }

    /// Persist preferences, stop capture, then release the display.
    fn shutdown(mut self, ticks: u64) -> MonitorOutcome {
        let preferences = Preferences {
            roi: self.control.roi().get(),
            fullscreen: self.control.flags().fullscreen(),
        };
        if let Some(path) = &self.preferences_path {
            match preferences.save(path) {
                Ok(()) => log::info!("Saved preferences to {}", path.display()),
                Err(e) => log::error!("{e}"),
            }
        }

        self.source.stop();
        // Headless: there is no window to tear down.
        log::debug!("Display released");

        if self.pipeline.pending_evidence() > 0 {
            log::warn!(
                "Discarding {} unsent detection(s)",
                self.pipeline.pending_evidence()
            );
        }
        self.pipeline.logger().summary();

        MonitorOutcome {
            ticks,
            preferences,
            status: self.pipeline.status().clone(),
        }
    }
}
