use crate::shared::frame::Frame;

/// A capture device that yields frames on demand.
///
/// `grab` blocks until the device produces the next frame. A failed grab is
/// not terminal: callers may retry on the next iteration.
pub trait FrameGrabber: Send {
    fn grab(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Releases the underlying device. Grabs after release fail.
    fn release(&mut self);
}
