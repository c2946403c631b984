use ndarray::{Array2, Zip};

use crate::shared::constants::{DEFAULT_MOTION_THRESHOLD, DEFAULT_PIXEL_THRESHOLD};
use crate::shared::frame::Frame;

/// Value a changed pixel contributes to the motion mask sum.
const MASK_ON: u64 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionGateConfig {
    /// Absolute grayscale difference a pixel must exceed to count as changed.
    pub pixel_threshold: u8,
    /// Mask sum (changed pixels × 255) the frame must exceed to open the gate.
    pub activity_threshold: u64,
}

impl Default for MotionGateConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: DEFAULT_PIXEL_THRESHOLD,
            activity_threshold: DEFAULT_MOTION_THRESHOLD,
        }
    }
}

/// Cheap frame-difference pre-filter in front of the detector.
///
/// Keeps the grayscale version of the last frame it was shown. With no
/// previous frame the gate stays closed.
pub struct MotionGate {
    config: MotionGateConfig,
    previous: Option<Array2<u8>>,
}

impl MotionGate {
    pub fn new(config: MotionGateConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    pub fn config(&self) -> MotionGateConfig {
        self.config
    }

    /// Compares `frame` with the previously observed frame, then remembers
    /// it for the next call.
    pub fn observe(&mut self, frame: &Frame) -> bool {
        let current = grayscale(frame);
        let open = self.should_run_detector(self.previous.as_ref(), &current);
        self.previous = Some(current);
        open
    }

    /// Whether the scene changed enough between two grayscale frames.
    ///
    /// Frames of different dimensions always count as motion, so a device
    /// reconfiguration cannot starve the detector.
    pub fn should_run_detector(&self, previous: Option<&Array2<u8>>, current: &Array2<u8>) -> bool {
        let Some(previous) = previous else {
            return false;
        };
        if previous.dim() != current.dim() {
            return true;
        }
        motion_score(previous, current, self.config.pixel_threshold) > self.config.activity_threshold
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl Default for MotionGate {
    fn default() -> Self {
        Self::new(MotionGateConfig::default())
    }
}

/// Sum of the binary mask of pixels whose absolute difference exceeds
/// `pixel_threshold`.
pub fn motion_score(previous: &Array2<u8>, current: &Array2<u8>, pixel_threshold: u8) -> u64 {
    let mut changed: u64 = 0;
    Zip::from(previous).and(current).for_each(|&a, &b| {
        if a.abs_diff(b) > pixel_threshold {
            changed += 1;
        }
    });
    changed * MASK_ON
}

/// ITU-R BT.601 luma of an RGB frame, shape `(height, width)`.
///
/// Single-channel frames are copied through unchanged.
pub fn grayscale(frame: &Frame) -> Array2<u8> {
    let px = frame.as_ndarray();
    let (h, w) = (frame.height() as usize, frame.width() as usize);
    if frame.channels() < 3 {
        return Array2::from_shape_fn((h, w), |(y, x)| px[[y, x, 0]]);
    }
    Array2::from_shape_fn((h, w), |(y, x)| {
        let r = px[[y, x, 0]] as u32;
        let g = px[[y, x, 1]] as u32;
        let b = px[[y, x, 2]] as u32;
        ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
    })
}
