use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::frame::Frame;

/// Pause after a failed grab before retrying, so a dead device does not spin.
const RETRY_DELAY: Duration = Duration::from_millis(20);

/// Consecutive failures between repeated warnings.
const FAILURE_LOG_INTERVAL: u64 = 100;

type LatestSlot = Arc<Mutex<Option<Arc<Frame>>>>;

/// Continuous acquisition on a dedicated thread, exposing only the newest
/// frame.
///
/// The acquisition loop never waits for consumers: each successful grab
/// replaces the previous frame in a single-slot buffer, so a slow reader
/// silently skips the frames it was too slow for.
pub struct FrameSource {
    latest: LatestSlot,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FrameSource {
    /// Spawns the acquisition thread. The grabber is released on that thread
    /// when the loop ends.
    pub fn start(grabber: Box<dyn FrameGrabber>) -> Self {
        let latest: LatestSlot = Arc::new(Mutex::new(None));
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = spawn_acquisition(grabber, latest.clone(), stopped.clone());
        Self {
            latest,
            stopped,
            handle: Some(handle),
        }
    }

    /// Most recent frame, or `None` before the first successful grab.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops acquisition, waits for the thread, and releases the device.
    /// Calling it again is a no-op.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Acquisition thread panicked");
            }
            log::info!("Frame source stopped");
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_acquisition(
    mut grabber: Box<dyn FrameGrabber>,
    latest: LatestSlot,
    stopped: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut sequence: u64 = 0;
        let mut failures: u64 = 0;

        while !stopped.load(Ordering::Relaxed) {
            match grabber.grab() {
                Ok(frame) => {
                    if failures > 0 {
                        log::info!("Capture recovered after {failures} failed reads");
                        failures = 0;
                    }
                    let frame = Arc::new(frame.with_sequence(sequence));
                    *latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                    sequence += 1;
                }
                Err(e) => {
                    failures += 1;
                    if failures == 1 || failures % FAILURE_LOG_INTERVAL == 0 {
                        log::warn!("Frame read failed ({failures} in a row): {e}");
                    }
                    thread::sleep(RETRY_DELAY);
                }
            }
        }

        grabber.release();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Produces frames whose first byte is the read count, failing on the
    /// reads listed in `fail_on`.
    struct ScriptedGrabber {
        reads: usize,
        fail_on: Vec<usize>,
        delay: Duration,
        released: Arc<AtomicBool>,
    }

    impl ScriptedGrabber {
        fn new(fail_on: Vec<usize>, released: Arc<AtomicBool>) -> Self {
            Self {
                reads: 0,
                fail_on,
                delay: Duration::from_millis(1),
                released,
            }
        }
    }

    impl FrameGrabber for ScriptedGrabber {
        fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
            thread::sleep(self.delay);
            let n = self.reads;
            self.reads += 1;
            if self.fail_on.contains(&n) {
                return Err(format!("read {n} failed").into());
            }
            Ok(Frame::new(vec![n as u8, 0, 0], 1, 1, 3, 0))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_latest_is_none_before_first_frame() {
        let released = Arc::new(AtomicBool::new(false));
        let mut grabber = ScriptedGrabber::new(vec![], released);
        grabber.delay = Duration::from_millis(200);
        let mut source = FrameSource::start(Box::new(grabber));
        assert!(source.latest().is_none());
        source.stop();
    }

    #[test]
    fn test_latest_advances_and_skips_frames() {
        let released = Arc::new(AtomicBool::new(false));
        let mut source = FrameSource::start(Box::new(ScriptedGrabber::new(vec![], released)));

        assert!(wait_for(|| source.latest().is_some_and(|f| f.sequence() >= 5)));
        let first = source.latest().unwrap().sequence();
        assert!(wait_for(|| source
            .latest()
            .is_some_and(|f| f.sequence() > first + 2)));
        source.stop();
    }

    #[test]
    fn test_failed_reads_are_not_fatal() {
        let released = Arc::new(AtomicBool::new(false));
        let grabber = ScriptedGrabber::new(vec![0, 1, 2], released);
        let mut source = FrameSource::start(Box::new(grabber));

        assert!(wait_for(|| source.latest().is_some()));
        let frame = source.latest().unwrap();
        // Reads 0..=2 failed, so sequence 0 came from read 3.
        assert_eq!(((frame.sequence() + 3) % 256) as u8, frame.data()[0]);
        source.stop();
    }

    #[test]
    fn test_stop_releases_device_and_is_idempotent() {
        let released = Arc::new(AtomicBool::new(false));
        let mut source =
            FrameSource::start(Box::new(ScriptedGrabber::new(vec![], released.clone())));
        assert!(source.is_running());

        source.stop();
        assert!(released.load(Ordering::SeqCst));
        assert!(!source.is_running());

        source.stop();
        assert!(!source.is_running());
    }

    #[test]
    fn test_latest_survives_stop() {
        let released = Arc::new(AtomicBool::new(false));
        let mut source = FrameSource::start(Box::new(ScriptedGrabber::new(vec![], released)));
        assert!(wait_for(|| source.latest().is_some()));
        source.stop();
        assert!(source.latest().is_some());
    }
}
