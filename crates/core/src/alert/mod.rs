pub mod alert_state;
pub mod domain;
pub mod evidence;
pub mod evidence_batcher;
pub mod infrastructure;
