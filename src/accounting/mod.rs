//! Accounting module
//!
//! Token/cost estimation and append-only usage recording.

pub mod estimator;
pub mod recorder;

pub use estimator::{estimate, Usage};
pub use recorder::{record_usage, JsonlUsageSink, MemoryUsageSink, UsageRecord, UsageSink};
