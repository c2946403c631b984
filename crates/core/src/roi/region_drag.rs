use crate::shared::region::Region;

/// Turns a press-drag-release gesture into a region.
///
/// While the button is held, `update` yields the region spanned so far so
/// the caller can publish it live.
#[derive(Debug, Default)]
pub struct RegionDrag {
    anchor: Option<(i32, i32)>,
}

impl RegionDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn start(&mut self, x: i32, y: i32) {
        self.anchor = Some((x, y));
    }

    /// Region from the anchor to `(x, y)`, or `None` when no drag is active.
    pub fn update(&self, x: i32, y: i32) -> Option<Region> {
        self.anchor.map(|a| Region::from_corners(a, (x, y)))
    }

    /// Finishes the drag. `None` if the release had no matching press.
    pub fn end(&mut self, x: i32, y: i32) -> Option<Region> {
        self.anchor.take().map(|a| Region::from_corners(a, (x, y)))
    }

    pub fn cancel(&mut self) {
        self.anchor = None;
    }
}
