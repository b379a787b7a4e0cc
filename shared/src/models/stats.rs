//! Derived read models (queue status, server statistics)

use serde::{Deserialize, Serialize};

/// Snapshot of the job queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub current_size: usize,
    pub max_size: usize,
    pub is_full: bool,
}

impl QueueStatus {
    pub fn new(current_size: usize, max_size: usize) -> Self {
        Self {
            current_size,
            max_size,
            is_full: current_size >= max_size,
        }
    }
}

/// Aggregate counters for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatistics {
    pub total_teams: usize,
    pub printer_enabled_teams: usize,
    pub total_uploads: u64,
    pub jobs_submitted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    /// Queued jobs removed together with their team
    pub jobs_cancelled: u64,
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub active_jobs: usize,
    pub available_slots: usize,
    pub total_processed: u64,
    pub hardware_printer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_status_is_derived() {
        assert!(!QueueStatus::new(2, 3).is_full);
        assert!(QueueStatus::new(3, 3).is_full);
        let json = serde_json::to_string(&QueueStatus::new(1, 15)).unwrap();
        assert_eq!(json, r#"{"currentSize":1,"maxSize":15,"isFull":false}"#);
    }
}
