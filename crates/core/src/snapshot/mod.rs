pub mod annotator;
pub mod domain;
pub mod infrastructure;
pub mod snapshot_recorder;
