use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::alert::alert_state::{AlertPhase, AlertState, AlertTransition};
use crate::alert::domain::notifier::Notifier;
use crate::alert::evidence::EvidenceItem;
use crate::alert::evidence_batcher::{EvidenceBatcher, FlushOutcome, DEFAULT_BATCH_WINDOW};
use crate::detection::detection_adapter::DetectionAdapter;
use crate::detection::domain::detection::Detection;
use crate::motion::motion_gate::{MotionGate, MotionGateConfig};
use crate::pipeline::monitor_status::MonitorStatus;
use crate::pipeline::pipeline_logger::{PipelineLogger, TICK_STAGE};
use crate::shared::frame::Frame;
use crate::shared::region::Region;
use crate::snapshot::annotator::annotate;
use crate::snapshot::snapshot_recorder::SnapshotRecorder;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub motion: MotionGateConfig,
    pub batch_window: Duration,
    /// Immediate delivery attempts per flush.
    pub notify_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            motion: MotionGateConfig::default(),
            batch_window: DEFAULT_BATCH_WINDOW,
            notify_attempts: 1,
        }
    }
}

/// What one tick did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub detector_ran: bool,
    pub detections: Vec<Detection>,
    pub transition: AlertTransition,
    pub evidence: Option<EvidenceItem>,
    pub flush: FlushOutcome,
}

/// Motion gate, detector, alert state and evidence batcher wired in order.
///
/// Single-threaded: the caller hands in one frame and one ROI snapshot per
/// tick.
pub struct MonitorPipeline {
    gate: MotionGate,
    adapter: DetectionAdapter,
    alert: AlertState,
    batcher: EvidenceBatcher,
    snapshots: SnapshotRecorder,
    status: MonitorStatus,
    logger: Box<dyn PipelineLogger>,
}

impl MonitorPipeline {
    pub fn new(
        config: PipelineConfig,
        adapter: DetectionAdapter,
        notifier: Box<dyn Notifier>,
        snapshots: SnapshotRecorder,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self::started_at(config, adapter, notifier, snapshots, logger, Instant::now())
    }

    /// Like `new`, with the first batch window opening at `started_at`.
    pub fn started_at(
        config: PipelineConfig,
        adapter: DetectionAdapter,
        notifier: Box<dyn Notifier>,
        snapshots: SnapshotRecorder,
        logger: Box<dyn PipelineLogger>,
        started_at: Instant,
    ) -> Self {
        let batcher = EvidenceBatcher::new(notifier, config.batch_window, started_at)
            .with_max_attempts(config.notify_attempts);
        Self {
            gate: MotionGate::new(config.motion),
            adapter,
            alert: AlertState::new(),
            batcher,
            snapshots,
            status: MonitorStatus::new(),
            logger,
        }
    }

    pub fn status(&self) -> &MonitorStatus {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut MonitorStatus {
        &mut self.status
    }

    pub fn alert_phase(&self) -> AlertPhase {
        self.alert.phase()
    }

    pub fn pending_evidence(&self) -> usize {
        self.batcher.pending()
    }

    pub fn logger(&self) -> &dyn PipelineLogger {
        self.logger.as_ref()
    }

    pub fn logger_mut(&mut self) -> &mut dyn PipelineLogger {
        self.logger.as_mut()
    }

    /// Processes one frame against the ROI as it was at the start of the tick.
    ///
    /// Without a region nothing is compared or detected and the alert state
    /// sees an empty tick. Detector failures count as an empty tick too.
    pub fn tick(&mut self, frame: &Frame, region: Option<Region>, now: Instant) -> TickReport {
        let tick_start = Instant::now();

        let (detector_ran, detections) = match region {
            Some(region) => self.detect(frame, &region),
            None => (false, Vec::new()),
        };

        let transition = self.alert.update(!detections.is_empty(), now);
        let evidence = match (transition, region) {
            (AlertTransition::Rising, Some(region)) => {
                Some(self.record_evidence(frame, &region, &detections))
            }
            (AlertTransition::Falling | AlertTransition::Quiet, Some(_)) => {
                self.status.clear_detections();
                None
            }
            _ => None,
        };

        let flush = self.batcher.tick(now);

        self.logger
            .timing(TICK_STAGE, tick_start.elapsed().as_secs_f64() * 1000.0);

        TickReport {
            detector_ran,
            detections,
            transition,
            evidence,
            flush,
        }
    }

    /// Lets the batcher flush on a loop iteration that had no new frame.
    pub fn poll_batcher(&mut self, now: Instant) -> FlushOutcome {
        self.batcher.tick(now)
    }

    fn detect(&mut self, frame: &Frame, region: &Region) -> (bool, Vec<Detection>) {
        let motion_start = Instant::now();
        let moved = self.gate.observe(frame);
        self.logger
            .timing("motion", motion_start.elapsed().as_secs_f64() * 1000.0);
        if !moved {
            return (false, Vec::new());
        }

        let detect_start = Instant::now();
        let detections = match self.adapter.detect_in_region(frame, region) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Detection failed: {e}");
                Vec::new()
            }
        };
        self.logger
            .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);
        self.logger
            .metric("in_roi_detections", detections.len() as f64);
        (true, detections)
    }

    fn record_evidence(
        &mut self,
        frame: &Frame,
        region: &Region,
        detections: &[Detection],
    ) -> EvidenceItem {
        let at: DateTime<Local> = frame.captured_at().into();
        let annotated = annotate(frame, region, detections);
        let snapshot = self.snapshots.record(&annotated, &at);
        let item = EvidenceItem::new(at, snapshot);

        self.status.record_detection(at);
        log::info!(
            "Person detected in ROI at {} ({} in view, alert #{})",
            at.format("%Y-%m-%d %H:%M:%S"),
            detections.len(),
            self.status.count()
        );
        self.batcher.append(item.clone());
        item
    }
}
