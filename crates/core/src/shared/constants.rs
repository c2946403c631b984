pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";

/// Class id the detector uses for "person".
pub const PERSON_CLASS_ID: u32 = 0;
pub const PERSON_LABEL: &str = "person";

/// COCO class names, indexed by class id.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Per-pixel grayscale difference above which a pixel counts as changed.
pub const DEFAULT_PIXEL_THRESHOLD: u8 = 25;

/// Sum of the binary motion mask (changed pixels × 255) that opens the gate.
pub const DEFAULT_MOTION_THRESHOLD: u64 = 100_000;

/// Seconds of evidence accumulated before a batched notification goes out.
pub const DEFAULT_BATCH_WINDOW_SECS: u64 = 60;

pub const SNAPSHOT_EXTENSION: &str = "jpg";

pub const APP_DIR_NAME: &str = "roiwatch";

pub const PREFERENCES_FILE_NAME: &str = "config.json";

/// Label for a COCO class id, or `"unknown"` outside the table.
pub fn class_label(class_id: u32) -> &'static str {
    COCO_CLASSES
        .get(class_id as usize)
        .copied()
        .unwrap_or("unknown")
}
