use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::{ObjectDetector, RawDetection};
use crate::shared::constants::PERSON_CLASS_ID;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Runs the detector on the whole frame and keeps the people whose box
/// centre lies inside the region.
///
/// The frame is never cropped to the region: the model needs the
/// surrounding context. Confidence is passed through untouched; any cutoff
/// belongs to the detector itself.
pub struct DetectionAdapter {
    detector: Box<dyn ObjectDetector>,
}

impl DetectionAdapter {
    pub fn new(detector: Box<dyn ObjectDetector>) -> Self {
        Self { detector }
    }

    pub fn detect_in_region(
        &mut self,
        frame: &Frame,
        region: &Region,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let raw = self.detector.infer(frame)?;
        Ok(people_in_region(&raw, region))
    }
}

/// Person detections whose integer centroid is inside `region` (edges
/// included).
pub fn people_in_region(raw: &[RawDetection], region: &Region) -> Vec<Detection> {
    raw.iter()
        .filter(|d| d.class_id == PERSON_CLASS_ID)
        .filter(|d| {
            let (cx, cy) = d.bbox.centroid();
            region.contains(cx, cy)
        })
        .map(Detection::from)
        .collect()
}
