pub mod index;
pub mod log_level;
pub mod metrics;
