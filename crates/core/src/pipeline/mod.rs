pub mod monitor_loop;
pub mod monitor_pipeline;
pub mod monitor_status;
pub mod pipeline_logger;
