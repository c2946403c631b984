use crate::detection::domain::object_detector::{BoundingBox, RawDetection};
use crate::shared::constants::class_label;

/// A labelled detection that survived filtering for the current tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: &'static str,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl From<&RawDetection> for Detection {
    fn from(raw: &RawDetection) -> Self {
        Self {
            label: class_label(raw.class_id),
            confidence: raw.confidence,
            bbox: raw.bbox,
        }
    }
}
