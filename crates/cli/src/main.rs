mod commands;
mod signals;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::Sender;

use roiwatch_core::alert::domain::notifier::Notifier;
use roiwatch_core::alert::infrastructure::log_notifier::LogNotifier;
use roiwatch_core::alert::infrastructure::outbox_notifier::OutboxNotifier;
use roiwatch_core::alert::infrastructure::webhook_notifier::WebhookNotifier;
use roiwatch_core::capture::frame_source::FrameSource;
use roiwatch_core::capture::infrastructure::ffmpeg_grabber::FfmpegGrabber;
use roiwatch_core::control::control_surface::{ControlEvent, ControlFlags, ControlSurface};
use roiwatch_core::detection::detection_adapter::DetectionAdapter;
use roiwatch_core::detection::domain::object_detector::ObjectDetector;
use roiwatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use roiwatch_core::motion::motion_gate::MotionGateConfig;
use roiwatch_core::pipeline::monitor_loop::MonitorLoop;
use roiwatch_core::pipeline::monitor_pipeline::{MonitorPipeline, PipelineConfig};
use roiwatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use roiwatch_core::preferences::preferences::Preferences;
use roiwatch_core::roi::roi_store::RoiStore;
use roiwatch_core::shared::constants::{
    DEFAULT_BATCH_WINDOW_SECS, DEFAULT_MOTION_THRESHOLD, DEFAULT_PIXEL_THRESHOLD, YOLO_MODEL_NAME,
};
use roiwatch_core::shared::model_resolver;
use roiwatch_core::shared::region::Region;
use roiwatch_core::snapshot::infrastructure::image_file_writer::ImageFileWriter;
use roiwatch_core::snapshot::snapshot_recorder::SnapshotRecorder;

/// Watches a camera feed and raises batched alerts when a person enters
/// the region of interest.
#[derive(Parser)]
#[command(name = "roiwatch")]
struct Cli {
    /// Capture device, stream URL or video file.
    #[arg(long, default_value = "/dev/video0")]
    source: String,

    /// Force an ffmpeg input format (e.g. v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// ONNX detector model (YOLOv8 layout).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Where to download the model from if it is not cached yet.
    #[arg(long)]
    model_url: Option<String>,

    /// Detector confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.25")]
    confidence: f32,

    /// Grayscale difference a pixel must exceed to count as changed.
    #[arg(long, default_value_t = DEFAULT_PIXEL_THRESHOLD)]
    pixel_threshold: u8,

    /// Motion mask sum that wakes the detector.
    #[arg(long, default_value_t = DEFAULT_MOTION_THRESHOLD)]
    motion_threshold: u64,

    /// Seconds between batched notifications.
    #[arg(long, default_value_t = DEFAULT_BATCH_WINDOW_SECS)]
    batch_window: u64,

    /// Delivery attempts per batch before it is dropped.
    #[arg(long, default_value = "1")]
    notify_attempts: u32,

    /// Directory for evidence snapshots.
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,

    /// Preferences file (defaults to the user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// POST each batch to this URL as multipart/form-data.
    #[arg(long)]
    webhook_url: Option<String>,

    /// Write each batch into a directory under this path.
    #[arg(long)]
    outbox: Option<PathBuf>,

    /// Start with this region instead of the saved one (x1,y1,x2,y2).
    #[arg(long, value_parser = commands::parse_region)]
    roi: Option<Region>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let preferences_path = cli.config.clone().or_else(Preferences::default_path);
    let mut preferences = preferences_path
        .as_deref()
        .map(Preferences::load)
        .unwrap_or_default();
    if let Some(roi) = cli.roi {
        preferences.roi = Some(roi);
    }

    let detector = build_detector(&cli)?;
    let notifier = build_notifier(&cli)?;

    log::info!("Opening {}", cli.source);
    let grabber = FfmpegGrabber::open(&cli.source, cli.input_format.as_deref())?;
    let source = FrameSource::start(Box::new(grabber));

    let control = Arc::new(ControlSurface::new(
        Arc::new(RoiStore::new(preferences.roi)),
        Arc::new(ControlFlags::new(preferences.fullscreen)),
    ));
    match preferences.roi {
        Some(roi) => log::info!("ROI: {roi}"),
        None => log::info!("No ROI yet; detection is idle until one is set"),
    }

    if let Err(e) = signals::quit_on(signals::shutdown_signal(), control.flags().clone()) {
        log::warn!("Signal handling unavailable; quit with 'q': {e}");
    }

    let (events, receiver) = crossbeam_channel::unbounded();
    spawn_command_reader(events);
    log::info!("{}", commands::HELP);

    let config = PipelineConfig {
        motion: MotionGateConfig {
            pixel_threshold: cli.pixel_threshold,
            activity_threshold: cli.motion_threshold,
        },
        batch_window: Duration::from_secs(cli.batch_window),
        notify_attempts: cli.notify_attempts,
    };
    let pipeline = MonitorPipeline::new(
        config,
        DetectionAdapter::new(detector),
        notifier,
        SnapshotRecorder::new(Box::new(ImageFileWriter::new()), &cli.snapshot_dir),
        Box::new(StdoutPipelineLogger::new()),
    );

    let mut monitor = MonitorLoop::new(source, pipeline, control, receiver);
    if let Some(path) = preferences_path {
        monitor = monitor.with_preferences_path(path);
    } else {
        log::warn!("No config directory; preferences will not be saved");
    }

    let outcome = monitor.run();
    log::info!("Stopped after {} ticks. {}", outcome.ticks, outcome.status);
    Ok(())
}

/// Reads operator commands from stdin on its own thread. Closing stdin
/// leaves the monitor running; signals still stop it.
fn spawn_command_reader(events: Sender<ControlEvent>) {
    thread::spawn(move || {
        let end = commands::forward_commands(std::io::stdin().lock(), &events);
        if end == commands::ReaderEnd::Closed {
            log::info!("Command input closed; stop with Ctrl+C or SIGTERM");
        }
    });
}

fn build_detector(cli: &Cli) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        cli.model.as_deref(),
        cli.model_url.as_deref(),
        Some(Box::new(download_progress)),
    )?;
    log::info!("Using model {}", model_path.display());
    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

fn build_notifier(cli: &Cli) -> Result<Box<dyn Notifier>, Box<dyn std::error::Error>> {
    if let Some(url) = &cli.webhook_url {
        log::info!("Batches go to webhook {url}");
        return Ok(Box::new(WebhookNotifier::new(url.as_str())?));
    }
    if let Some(dir) = &cli.outbox {
        log::info!("Batches go to outbox {}", dir.display());
        return Ok(Box::new(OutboxNotifier::new(dir)));
    }
    log::info!("No notification transport configured; batches are logged");
    Ok(Box::new(LogNotifier::new()))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.batch_window == 0 {
        return Err("Batch window must be at least one second".into());
    }
    if cli.notify_attempts == 0 {
        return Err("Notify attempts must be at least 1".into());
    }
    if cli.webhook_url.is_some() && cli.outbox.is_some() {
        return Err("--webhook-url and --outbox are mutually exclusive".into());
    }
    if let Some(path) = &cli.model {
        if !path.exists() {
            return Err(format!("Model file not found: {}", path.display()).into());
        }
    }
    if let Some(url) = &cli.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("Webhook URL must be http(s), got '{url}'").into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
