use crate::shared::frame::Frame;

/// Axis-aligned box in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Integer centre point: corners truncate to whole pixels, then the
    /// midpoint floors.
    pub fn centroid(&self) -> (i32, i32) {
        let (x1, y1, x2, y2) = self.to_pixels();
        ((x1 + x2).div_euclid(2), (y1 + y2).div_euclid(2))
    }

    pub fn to_pixels(&self) -> (i32, i32, i32, i32) {
        (
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// One object reported by a detector backend, before any filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Detector capability: full frame in, all detected objects out.
///
/// Implementations may keep per-call scratch state, hence `&mut self`.
pub trait ObjectDetector: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
