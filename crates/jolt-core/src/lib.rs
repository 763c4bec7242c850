pub mod live;
pub mod log_filter;
pub mod metrics;
pub mod statistics;
pub mod task_set;
pub mod workers;

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use live::{Generation, LiveSession, LiveState, ReconnectTicket, RECONNECT_DELAY};
pub use log_filter::{LogFilter, LogLevel};
pub use metrics::{format_duration, QueueMetrics, TaskCounters};
pub use statistics::{BaseMetrics, Metrics, Statistics, WaitTime};
pub use task_set::TaskSet;
pub use workers::{derive_workers, WorkerRow, WorkerView};

/// One unit of queued or executed work, as published by the backend.
///
/// Field names follow the backend's JSON encoding, which capitalizes
/// everything except `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    #[serde(rename = "id")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub worker: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub queued: String,
    #[serde(default)]
    pub started: String,
    #[serde(default)]
    pub ended: String,
    #[serde(default)]
    pub log: String,
}

impl Task {
    pub fn queued_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.queued).ok()
    }

    pub fn started_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.started).ok()
    }

    pub fn ended_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.ended).ok()
    }

    pub fn has_worker(&self) -> bool {
        !self.worker.trim().is_empty()
    }

    pub fn has_log(&self) -> bool {
        !self.log.trim().is_empty()
    }

    /// Wall time between start and end, if the task has finished.
    pub fn duration_secs(&self) -> Option<f64> {
        let started = self.started_at()?;
        let ended = self.ended_at()?;
        Some((ended - started).num_milliseconds() as f64 / 1000.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Cancelled,
    Deleted,
}

impl TaskStatus {
    pub const VISIBLE: [TaskStatus; 5] = [
        TaskStatus::Queued,
        TaskStatus::Running,
        TaskStatus::Passed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "Queued",
            TaskStatus::Running => "Running",
            TaskStatus::Passed => "Passed",
            TaskStatus::Failed => "Failed",
            TaskStatus::Cancelled => "Cancelled",
            TaskStatus::Deleted => "Deleted",
        }
    }

    /// Statuses that take part in queue-time statistics.
    pub fn counts_toward_queue_time(&self) -> bool {
        matches!(
            self,
            TaskStatus::Queued | TaskStatus::Running | TaskStatus::Passed | TaskStatus::Failed
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "passed" => Ok(TaskStatus::Passed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            "deleted" => Ok(TaskStatus::Deleted),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp is empty")]
    Empty,
    #[error("unrecognized timestamp '{0}'")]
    Invalid(String),
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a backend timestamp into local wall-clock time.
///
/// The backend writes `2006-01-02 15:04:05.999` in its own local time;
/// RFC 3339 input is converted to this machine's local time.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimestampError::Empty);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Local).naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    Err(TimestampError::Invalid(trimmed.to_string()))
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn task_decodes_backend_json() {
        let raw = r#"{
            "id": "8f7c3c52-8f29-4a5e-9d2a-2d3e1f4b5a60",
            "Name": "build/linux",
            "Identity": "1f2e3d",
            "RoutingKey": "linux",
            "Worker": "w1",
            "Status": "Running",
            "Queued": "2024-03-01 10:00:00.125",
            "Started": "2024-03-01 10:00:05",
            "Ended": "",
            "Log": "http://logs/1"
        }"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.name, "build/linux");
        assert_eq!(task.routing_key, "linux");
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.has_worker());
        assert!(task.has_log());
        assert!(task.ended_at().is_none());
        assert_eq!(task.started_at().unwrap().second(), 5);
    }

    #[test]
    fn task_decodes_with_missing_optional_fields() {
        let raw = r#"{"id": "8f7c3c52-8f29-4a5e-9d2a-2d3e1f4b5a60", "Status": "Deleted"}"#;
        let task: Task = serde_json::from_str(raw).unwrap();
        assert_eq!(task.status, TaskStatus::Deleted);
        assert!(task.name.is_empty());
        assert!(!task.has_worker());
    }

    #[test]
    fn task_rejects_unknown_status() {
        let raw = r#"{"id": "8f7c3c52-8f29-4a5e-9d2a-2d3e1f4b5a60", "Status": "Exploded"}"#;
        assert!(serde_json::from_str::<Task>(raw).is_err());
    }

    #[test]
    fn status_from_str_accepts_case_variants() {
        assert_eq!("queued".parse::<TaskStatus>(), Ok(TaskStatus::Queued));
        assert_eq!(" RUNNING ".parse::<TaskStatus>(), Ok(TaskStatus::Running));
        assert_eq!("canceled".parse::<TaskStatus>(), Ok(TaskStatus::Cancelled));
        assert!("nope".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn parse_timestamp_supports_backend_and_iso_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 10:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T10:00:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-03-01 10:00:00.5").unwrap().nanosecond(),
            500_000_000
        );
        assert_eq!(parse_timestamp("  "), Err(TimestampError::Empty));
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(TimestampError::Invalid(_))
        ));
    }

    #[test]
    fn duration_requires_start_and_end() {
        let mut task: Task = serde_json::from_str(
            r#"{"id": "8f7c3c52-8f29-4a5e-9d2a-2d3e1f4b5a60", "Status": "Passed",
                "Started": "2024-03-01 10:00:00", "Ended": "2024-03-01 10:01:30.5"}"#,
        )
        .unwrap();
        assert_eq!(task.duration_secs(), Some(90.5));
        task.ended.clear();
        assert_eq!(task.duration_secs(), None);
    }
}
