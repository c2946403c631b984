use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::roi::region_drag::RegionDrag;
use crate::roi::roi_store::RoiStore;
use crate::shared::region::Region;

/// Input from whatever drives the monitor: mouse gestures, keys, buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    RegionDragStart { x: i32, y: i32 },
    RegionDragUpdate { x: i32, y: i32 },
    RegionDragEnd { x: i32, y: i32 },
    /// Sets the region directly, as if a whole drag had happened at once.
    RegionSet(Region),
    ResetRequested,
    FullscreenToggleRequested,
    ResetCountRequested,
    QuitRequested,
}

/// What an event changed, for the caller to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlEffect {
    None,
    RegionChanged(Region),
    RegionCleared,
    FullscreenChanged(bool),
    CountReset,
    Quit,
}

/// Display and lifecycle flags shared between the control side and the
/// monitor loop. Each flag is a single atomic value.
#[derive(Debug, Default)]
pub struct ControlFlags {
    fullscreen: AtomicBool,
    quit: AtomicBool,
}

impl ControlFlags {
    pub fn new(fullscreen: bool) -> Self {
        Self {
            fullscreen: AtomicBool::new(fullscreen),
            quit: AtomicBool::new(false),
        }
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    /// Flips fullscreen and returns the new value.
    pub fn toggle_fullscreen(&self) -> bool {
        !self.fullscreen.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

/// Narrow mutation interface over the ROI store and flags.
///
/// While a drag is in progress the store already holds the rectangle
/// spanned so far, so detection follows the gesture live.
pub struct ControlSurface {
    roi: Arc<RoiStore>,
    flags: Arc<ControlFlags>,
    drag: Mutex<RegionDrag>,
}

impl ControlSurface {
    pub fn new(roi: Arc<RoiStore>, flags: Arc<ControlFlags>) -> Self {
        Self {
            roi,
            flags,
            drag: Mutex::new(RegionDrag::new()),
        }
    }

    pub fn roi(&self) -> &Arc<RoiStore> {
        &self.roi
    }

    pub fn flags(&self) -> &Arc<ControlFlags> {
        &self.flags
    }

    pub fn apply(&self, event: ControlEvent) -> ControlEffect {
        let mut drag = self.drag.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            ControlEvent::RegionDragStart { x, y } => {
                drag.start(x, y);
                ControlEffect::None
            }
            ControlEvent::RegionDragUpdate { x, y } => match drag.update(x, y) {
                Some(region) => {
                    self.roi.set(region);
                    ControlEffect::RegionChanged(region)
                }
                None => ControlEffect::None,
            },
            ControlEvent::RegionDragEnd { x, y } => match drag.end(x, y) {
                Some(region) => {
                    self.roi.set(region);
                    log::info!("ROI set to {region}");
                    ControlEffect::RegionChanged(region)
                }
                None => ControlEffect::None,
            },
            ControlEvent::RegionSet(region) => {
                drag.cancel();
                self.roi.set(region);
                log::info!("ROI set to {region}");
                ControlEffect::RegionChanged(region)
            }
            ControlEvent::ResetRequested => {
                drag.cancel();
                self.roi.clear();
                log::info!("ROI reset");
                ControlEffect::RegionCleared
            }
            ControlEvent::FullscreenToggleRequested => {
                let on = self.flags.toggle_fullscreen();
                log::info!("Fullscreen {}", if on { "ON" } else { "OFF" });
                ControlEffect::FullscreenChanged(on)
            }
            ControlEvent::ResetCountRequested => ControlEffect::CountReset,
            ControlEvent::QuitRequested => {
                self.flags.request_quit();
                ControlEffect::Quit
            }
        }
    }
}
