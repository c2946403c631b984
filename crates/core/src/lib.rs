pub mod alert;
pub mod capture;
pub mod control;
pub mod detection;
pub mod motion;
pub mod pipeline;
pub mod preferences;
pub mod roi;
pub mod shared;
pub mod snapshot;
