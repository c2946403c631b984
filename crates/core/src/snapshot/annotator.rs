use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

pub const ROI_COLOR: [u8; 3] = [0, 255, 0];
pub const DETECTION_COLOR: [u8; 3] = [255, 0, 0];
pub const LINE_THICKNESS: i32 = 2;
pub const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];

const GLYPH_COLS: usize = 3;
const GLYPH_ROWS: usize = 5;
const GLYPH_SCALE: i32 = 2;
const LABEL_PADDING: i32 = 2;

/// Copy of `frame` with the region outlined in green and every detection
/// box in red with a `Person 0.87` tag above it, as saved in snapshots.
pub fn annotate(frame: &Frame, region: &Region, detections: &[Detection]) -> Frame {
    let mut annotated = frame.clone();
    draw_rect(
        &mut annotated,
        (region.x1(), region.y1(), region.x2(), region.y2()),
        ROI_COLOR,
    );
    for detection in detections {
        let rect = detection.bbox.to_pixels();
        draw_rect(&mut annotated, rect, DETECTION_COLOR);
        draw_label(
            &mut annotated,
            rect.0.min(rect.2),
            rect.1.min(rect.3),
            &label_text(detection),
        );
    }
    annotated
}

/// Class name, capitalised, and confidence to two decimals.
pub fn label_text(detection: &Detection) -> String {
    let mut chars = detection.label.chars();
    let name: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{name} {:.2}", detection.confidence)
}

/// Paints `text` on a filled tag whose bottom edge sits on `top`. When the
/// tag would leave the frame it hangs inside the box instead.
fn draw_label(frame: &mut Frame, left: i32, top: i32, text: &str) {
    if frame.channels() < 3 {
        return;
    }
    let advance = (GLYPH_COLS as i32 + 1) * GLYPH_SCALE;
    let tag_height = GLYPH_ROWS as i32 * GLYPH_SCALE + 2 * LABEL_PADDING;
    let tag_width = text.chars().count() as i32 * advance - GLYPH_SCALE + 2 * LABEL_PADDING;
    let y = if top - tag_height >= 0 { top - tag_height } else { top };

    fill(frame, left, y, left + tag_width - 1, y + tag_height - 1, DETECTION_COLOR);

    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        let gx = left + LABEL_PADDING + i as i32 * advance;
        let gy = y + LABEL_PADDING;
        for (r, bits) in rows.iter().enumerate() {
            for c in 0..GLYPH_COLS {
                if bits & (1 << (GLYPH_COLS - 1 - c)) == 0 {
                    continue;
                }
                let px = gx + c as i32 * GLYPH_SCALE;
                let py = gy + r as i32 * GLYPH_SCALE;
                fill(
                    frame,
                    px,
                    py,
                    px + GLYPH_SCALE - 1,
                    py + GLYPH_SCALE - 1,
                    LABEL_TEXT_COLOR,
                );
            }
        }
    }
}

/// 3x5 bitmaps, one row per entry, most significant bit on the left.
/// Characters without a bitmap leave a gap.
fn glyph(ch: char) -> Option<[u8; GLYPH_ROWS]> {
    let rows = match ch.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        'E' => [0b111, 0b100, 0b110, 0b100, 0b111],
        'N' => [0b101, 0b111, 0b111, 0b101, 0b101],
        'O' => [0b010, 0b101, 0b101, 0b101, 0b010],
        'P' => [0b110, 0b101, 0b110, 0b100, 0b100],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b011, 0b100, 0b010, 0b001, 0b110],
        _ => return None,
    };
    Some(rows)
}

/// Outlines the rectangle with lines `LINE_THICKNESS` pixels wide, growing
/// inward. Parts outside the frame are clipped.
fn draw_rect(frame: &mut Frame, rect: (i32, i32, i32, i32), color: [u8; 3]) {
    if frame.channels() < 3 {
        return;
    }
    let (x1, y1) = (rect.0.min(rect.2), rect.1.min(rect.3));
    let (x2, y2) = (rect.0.max(rect.2), rect.1.max(rect.3));

    for t in 0..LINE_THICKNESS {
        fill(frame, x1, y1 + t, x2, y1 + t, color);
        fill(frame, x1, y2 - t, x2, y2 - t, color);
        fill(frame, x1 + t, y1, x1 + t, y2, color);
        fill(frame, x2 - t, y1, x2 - t, y2, color);
    }
}

/// Paints the inclusive span `(x1, y1)..=(x2, y2)` clipped to the frame.
fn fill(frame: &mut Frame, x1: i32, y1: i32, x2: i32, y2: i32, color: [u8; 3]) {
    let max_x = frame.width() as i32 - 1;
    let max_y = frame.height() as i32 - 1;
    let (x1, x2) = (x1.max(0), x2.min(max_x));
    let (y1, y2) = (y1.max(0), y2.min(max_y));
    if x1 > x2 || y1 > y2 {
        return;
    }

    let mut pixels = frame.as_ndarray_mut();
    for y in y1..=y2 {
        for x in x1..=x2 {
            for (c, value) in color.iter().enumerate() {
                pixels[[y as usize, x as usize, c]] = *value;
            }
        }
    }
}
