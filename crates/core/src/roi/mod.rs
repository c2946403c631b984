pub mod region_drag;
pub mod roi_store;
