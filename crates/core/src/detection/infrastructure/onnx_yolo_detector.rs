//! YOLO object detector using ONNX Runtime via `ort`.
//!
//! Handles letterbox preprocessing, inference on YOLOv8-style heads
//! (`[1, 4 + classes, anchors]`), and class-aware NMS.
use std::path::Path;

use crate::detection::domain::object_detector::{BoundingBox, ObjectDetector, RawDetection};
use crate::shared::frame::Frame;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default detector-level confidence cutoff.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f32 = 0.7;

/// Box coordinates at the start of every anchor row: cx, cy, w, h.
const BOX_VALUES: usize = 4;

/// YOLO object detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 if the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let (providers, accelerator) = accelerated_providers();
        let session = ort::session::Session::builder()?
            .with_execution_providers(providers)?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::info!(
            "Loaded detector {} (input {input_size}px, confidence {confidence:.2}, {accelerator})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input_tensor, lb) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // YOLOv8 exports [1, features, anchors]; some exports transpose it.
        let transposed = shape[1] < shape[2];
        let (num_anchors, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats <= BOX_VALUES {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }

        let data: Vec<f32> = tensor.iter().copied().collect();
        let value = |anchor: usize, feat: usize| {
            if transposed {
                data[feat * num_anchors + anchor]
            } else {
                data[anchor * num_feats + feat]
            }
        };

        let mut candidates = Vec::new();
        for i in 0..num_anchors {
            let (class_id, score) = (BOX_VALUES..num_feats)
                .map(|f| (f - BOX_VALUES, value(i, f)))
                .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
            if score < self.confidence {
                continue;
            }

            let cx = value(i, 0);
            let cy = value(i, 1);
            let w = value(i, 2);
            let h = value(i, 3);
            candidates.push(RawDetection {
                class_id: class_id as u32,
                confidence: score,
                bbox: lb.unmap(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
            });
        }

        Ok(nms(candidates, NMS_IOU_THRESH))
    }
}

/// Platform accelerator to try before ONNX Runtime's CPU fallback, with a
/// name for logging.
fn accelerated_providers() -> (
    Vec<ort::execution_providers::ExecutionProviderDispatch>,
    &'static str,
) {
    #[cfg(target_os = "macos")]
    {
        (
            vec![ort::execution_providers::CoreMLExecutionProvider::default().build()],
            "CoreML",
        )
    }
    #[cfg(target_os = "windows")]
    {
        (
            vec![ort::execution_providers::DirectMLExecutionProvider::default().build()],
            "DirectML",
        )
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        (Vec::new(), "CPU")
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding applied by [`letterbox`], for mapping boxes back.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    frame_w: f32,
    frame_h: f32,
}

impl Letterbox {
    /// Maps a box from model input coordinates to frame coordinates,
    /// clamped to the frame.
    fn unmap(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        let fx = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, self.frame_w);
        let fy = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, self.frame_h);
        BoundingBox::new(fx(x1), fy(y1), fx(x2), fy(y2))
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` as an NCHW
/// float32 tensor in [0, 1], padded with YOLO's 114 gray.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbour resize into the padded area
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale: scale as f32,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
            frame_w: fw as f32,
            frame_h: fh as f32,
        },
    )
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy per-class NMS: highest confidence first, suppressing overlapping
/// boxes of the same class only.
fn nms(mut dets: Vec<RawDetection>, iou_thresh: f32) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && bbox_iou(&k.bbox, &det.bbox) > iou_thresh);
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

fn bbox_iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
