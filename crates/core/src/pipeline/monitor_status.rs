use chrono::{DateTime, Local};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusText {
    Waiting,
    NoDetections,
    PersonDetected,
    RoiReset,
    CountReset,
}

impl std::fmt::Display for StatusText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusText::Waiting => write!(f, "No detections yet"),
            StatusText::NoDetections => write!(f, "No detections"),
            StatusText::PersonDetected => write!(f, "Person detected"),
            StatusText::RoiReset => write!(f, "ROI reset"),
            StatusText::CountReset => write!(f, "Count reset"),
        }
    }
}

/// Dashboard view of the monitor: status line, alerts fired so far and
/// when the last one fired.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorStatus {
    text: StatusText,
    count: u64,
    last_detection: Option<DateTime<Local>>,
}

impl MonitorStatus {
    pub fn new() -> Self {
        Self {
            text: StatusText::Waiting,
            count: 0,
            last_detection: None,
        }
    }

    pub fn text(&self) -> StatusText {
        self.text
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_detection(&self) -> Option<DateTime<Local>> {
        self.last_detection
    }

    /// A rising edge fired.
    pub fn record_detection(&mut self, at: DateTime<Local>) {
        self.text = StatusText::PersonDetected;
        self.count += 1;
        self.last_detection = Some(at);
    }

    pub fn clear_detections(&mut self) {
        self.text = StatusText::NoDetections;
    }

    pub fn roi_reset(&mut self) {
        self.text = StatusText::RoiReset;
    }

    /// Zeroes the counter. The last detection time is kept.
    pub fn reset_count(&mut self) {
        self.count = 0;
        self.text = StatusText::CountReset;
    }
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | detections: {}", self.text, self.count)?;
        if let Some(at) = self.last_detection {
            write!(f, " | last: {}", at.format("%Y-%m-%d %H:%M:%S"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_counts_detections() {
        let mut status = MonitorStatus::new();
        assert_eq!(status.to_string(), "No detections yet | detections: 0");

        let at = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        status.record_detection(at);
        status.record_detection(at);
        assert_eq!(status.count(), 2);
        assert_eq!(status.text(), StatusText::PersonDetected);
        assert_eq!(
            status.to_string(),
            "Person detected | detections: 2 | last: 2024-03-01 12:30:00"
        );
    }

    #[test]
    fn test_reset_count_keeps_last_time() {
        let mut status = MonitorStatus::new();
        status.record_detection(Local::now());
        status.reset_count();
        assert_eq!(status.count(), 0);
        assert_eq!(status.text(), StatusText::CountReset);
        assert!(status.last_detection().is_some());
    }

    #[test]
    fn test_roi_reset_text() {
        let mut status = MonitorStatus::new();
        status.roi_reset();
        assert_eq!(status.text().to_string(), "ROI reset");
        status.clear_detections();
        assert_eq!(status.text().to_string(), "No detections");
    }
}
