use thiserror::Error;

use crate::capture::domain::frame_grabber::FrameGrabber;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open capture source {source_name}: {cause}")]
    Open {
        source_name: String,
        #[source]
        cause: ffmpeg_next::Error,
    },
    #[error("unknown input format: {0}")]
    UnknownFormat(String),
    #[error("no video stream in {0}")]
    NoVideoStream(String),
    #[error("decode failed: {0}")]
    Decode(#[from] ffmpeg_next::Error),
    #[error("end of stream")]
    EndOfStream,
    #[error("capture device released")]
    Released,
}

/// Grabs frames from a camera device, network stream, or file via
/// ffmpeg-next (libavdevice + libavformat + libavcodec).
///
/// Every decoded frame is converted to RGB24.
pub struct FfmpegGrabber {
    capture: Option<Capture>,
}

struct Capture {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    converter: RgbConverter,
    stream_index: usize,
    flushing: bool,
}

/// Network reads give up after this long, so a stalled stream surfaces as a
/// failed grab instead of blocking the acquisition thread forever.
const NETWORK_TIMEOUT_MICROS: &str = "5000000";

/// Demuxer options for `source`. URLs get socket and read timeouts; local
/// devices and files are opened with defaults.
fn open_options(source: &str) -> ffmpeg_next::Dictionary<'static> {
    let mut options = ffmpeg_next::Dictionary::new();
    if source.contains("://") && !source.starts_with("file://") {
        options.set("rw_timeout", NETWORK_TIMEOUT_MICROS);
        options.set("timeout", NETWORK_TIMEOUT_MICROS);
    }
    options
}

/// Converts decoded frames to packed RGB24, rebuilding the scaler whenever
/// the decoder's output size or pixel format changes mid-stream.
struct RgbConverter {
    scaler: ffmpeg_next::software::scaling::Context,
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

impl RgbConverter {
    fn new(
        format: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
    ) -> Result<Self, ffmpeg_next::Error> {
        let scaler = ffmpeg_next::software::scaling::Context::get(
            format,
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;
        Ok(Self {
            scaler,
            format,
            width,
            height,
        })
    }

    fn matches(&self, decoded: &ffmpeg_next::util::frame::video::Video) -> bool {
        decoded.format() == self.format
            && decoded.width() == self.width
            && decoded.height() == self.height
    }

    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
    ) -> Result<Frame, ffmpeg_next::Error> {
        if !self.matches(decoded) {
            log::info!(
                "Capture input changed from {}x{} {:?} to {}x{} {:?}",
                self.width,
                self.height,
                self.format,
                decoded.width(),
                decoded.height(),
                decoded.format()
            );
            *self = Self::new(decoded.format(), decoded.width(), decoded.height())?;
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut rgb)?;
        let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
        Ok(Frame::new(pixels, self.width, self.height, 3, 0))
    }
}

// Safety: the grabber is owned by exactly one acquisition thread at a time.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegGrabber {}

impl FfmpegGrabber {
    /// Opens `source`, optionally forcing an input format such as `v4l2`,
    /// `avfoundation` or `dshow` for camera devices.
    pub fn open(source: &str, input_format: Option<&str>) -> Result<Self, CaptureError> {
        let open_err = |cause| CaptureError::Open {
            source_name: source.to_string(),
            cause,
        };
        ffmpeg_next::init().map_err(open_err)?;
        ffmpeg_next::device::register_all();

        let input = match input_format {
            Some(name) => {
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == name)
                    .ok_or_else(|| CaptureError::UnknownFormat(name.to_string()))?;
                let ctx = ffmpeg_next::format::open_with(
                    &source,
                    &ffmpeg_next::format::Format::Input(format),
                    open_options(source),
                )
                .map_err(open_err)?;
                match ctx {
                    ffmpeg_next::format::context::Context::Input(input) => input,
                    ffmpeg_next::format::context::Context::Output(_) => {
                        return Err(CaptureError::NoVideoStream(source.to_string()))
                    }
                }
            }
            None => {
                ffmpeg_next::format::input_with_dictionary(&source, open_options(source))
                    .map_err(open_err)?
            }
        };

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(source.to_string()))?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let converter = RgbConverter::new(decoder.format(), width, height)?;

        log::info!("Opened capture source {source} ({width}x{height})");

        Ok(Self {
            capture: Some(Capture {
                input,
                decoder,
                converter,
                stream_index,
                flushing: false,
            }),
        })
    }
}

impl FrameGrabber for FfmpegGrabber {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let cap = self.capture.as_mut().ok_or(CaptureError::Released)?;
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();

        while cap.decoder.receive_frame(&mut decoded).is_err() {
            let Some((stream, packet)) = cap.input.packets().next() else {
                if cap.flushing {
                    return Err(CaptureError::EndOfStream.into());
                }
                cap.flushing = true;
                cap.decoder.send_eof().map_err(CaptureError::Decode)?;
                continue;
            };
            if stream.index() != cap.stream_index {
                continue;
            }
            cap.decoder
                .send_packet(&packet)
                .map_err(CaptureError::Decode)?;
        }

        let frame = cap.converter.convert(&decoded).map_err(CaptureError::Decode)?;
        Ok(frame)
    }

    fn release(&mut self) {
        if self.capture.take().is_some() {
            log::debug!("Capture source released");
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping the per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes `num_frames` flat-gray MPEG-4 frames to `path`.
    fn write_test_clip(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 10;
        let mut octx = ffmpeg_next::format::output(&path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut enc = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(ffmpeg_next::format::Pixel::YUV420P);
        enc.set_time_base(ffmpeg_next::Rational(1, fps));
        enc.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            enc.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = enc.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            for b in rgb.data_mut(0).iter_mut() {
                *b = 128;
            }
            let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb, &mut yuv).unwrap();
            yuv.set_pts(Some(i as i64));
            encoder.send_frame(&yuv).unwrap();

            let mut packet = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                packet.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut packet = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            packet.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    fn yuv_frame(width: u32, height: u32, luma: u8) -> ffmpeg_next::util::frame::video::Video {
        let mut frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
        );
        for plane in 0..frame.planes() {
            let fill = if plane == 0 { luma } else { 128 };
            for b in frame.data_mut(plane).iter_mut() {
                *b = fill;
            }
        }
        frame
    }

    #[test]
    fn test_converter_follows_mid_stream_size_change() {
        ffmpeg_next::init().unwrap();
        let mut converter =
            RgbConverter::new(ffmpeg_next::format::Pixel::YUV420P, 64, 48).unwrap();

        let first = converter.convert(&yuv_frame(64, 48, 100)).unwrap();
        assert_eq!((first.width(), first.height()), (64, 48));
        assert_eq!(first.data().len(), 64 * 48 * 3);

        let resized = converter.convert(&yuv_frame(128, 96, 100)).unwrap();
        assert_eq!((resized.width(), resized.height()), (128, 96));
        assert_eq!(resized.data().len(), 128 * 96 * 3);

        let shrunk = converter.convert(&yuv_frame(32, 16, 100)).unwrap();
        assert_eq!((shrunk.width(), shrunk.height()), (32, 16));
        assert_eq!(shrunk.data().len(), 32 * 16 * 3);
    }

    #[test]
    fn test_converter_follows_pixel_format_change() {
        ffmpeg_next::init().unwrap();
        let mut converter =
            RgbConverter::new(ffmpeg_next::format::Pixel::RGB24, 16, 16).unwrap();

        let frame = converter.convert(&yuv_frame(16, 16, 60)).unwrap();
        assert_eq!(frame.data().len(), 16 * 16 * 3);
        assert_eq!(converter.format, ffmpeg_next::format::Pixel::YUV420P);
    }

    #[test]
    fn test_network_sources_get_read_timeouts() {
        let options = open_options("rtsp://10.0.0.5:554/stream");
        assert_eq!(options.get("rw_timeout"), Some(NETWORK_TIMEOUT_MICROS));
        assert_eq!(options.get("timeout"), Some(NETWORK_TIMEOUT_MICROS));

        let options = open_options("http://camera.local/mjpeg");
        assert_eq!(options.get("rw_timeout"), Some(NETWORK_TIMEOUT_MICROS));
    }

    #[test]
    fn test_local_sources_open_without_timeouts() {
        for source in ["/dev/video0", "clip.mp4", "file:///tmp/clip.mp4", "0"] {
            let options = open_options(source);
            assert_eq!(options.get("rw_timeout"), None, "{source}");
            assert_eq!(options.get("timeout"), None, "{source}");
        }
    }

    #[test]
    fn test_open_nonexistent_source_errors() {
        let result = FfmpegGrabber::open("/nonexistent/camera.mp4", None);
        assert!(matches!(result, Err(CaptureError::Open { .. })));
    }

    #[test]
    fn test_unknown_input_format_errors() {
        let result = FfmpegGrabber::open("/dev/video0", Some("no-such-format"));
        assert!(matches!(result, Err(CaptureError::UnknownFormat(_))));
    }

    #[test]
    fn test_grab_yields_rgb_frames_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_clip(&path, 3, 64, 48);

        let mut grabber = FfmpegGrabber::open(path.to_str().unwrap(), None).unwrap();
        let frame = grabber.grab().unwrap();
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data().len(), 64 * 48 * 3);

        let mut extra = 0;
        while grabber.grab().is_ok() {
            extra += 1;
            assert!(extra < 10, "grabber never reached end of stream");
        }
    }

    #[test]
    fn test_grab_after_release_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_clip(&path, 2, 32, 32);

        let mut grabber = FfmpegGrabber::open(path.to_str().unwrap(), None).unwrap();
        grabber.release();
        grabber.release();
        let err = grabber.grab().unwrap_err();
        assert!(err.to_string().contains("released"));
    }
}
