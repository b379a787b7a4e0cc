//! Data models
//!
//! Serialized in camelCase for the dashboard and HTTP layer.
//! Timestamps are Unix milliseconds.

pub mod command;
pub mod job;
pub mod stats;
pub mod team;

// Re-exports
pub use command::*;
pub use job::*;
pub use stats::*;
pub use team::*;

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
