use crate::{Task, TaskStatus};
use chrono::NaiveDateTime;
use std::time::Duration;

pub const LIVE_REFRESH_INTERVAL: Duration = Duration::from_secs(10);
pub const EMPTY_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Queue-time statistics over queued, running, passed and failed tasks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueueMetrics {
    pub average: f64,
    pub median: f64,
    /// Longest wait among tasks that are still queued.
    pub max: f64,
    pub included: usize,
}

impl QueueMetrics {
    pub fn compute<'a, I>(tasks: I, now: NaiveDateTime) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut samples = Vec::new();
        let mut max = 0.0_f64;
        let mut included = 0;
        for task in tasks {
            if !task.status.counts_toward_queue_time() {
                continue;
            }
            included += 1;
            let Some(wait) = queue_seconds(task, now) else {
                continue;
            };
            samples.push(wait);
            if task.status == TaskStatus::Queued {
                max = max.max(wait);
            }
        }

        let average = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        Self {
            average,
            median: median(&mut samples),
            max,
            included,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.included == 0
    }

    pub fn refresh_interval(&self) -> Duration {
        if self.is_empty() {
            EMPTY_REFRESH_INTERVAL
        } else {
            LIVE_REFRESH_INTERVAL
        }
    }

    pub fn average_label(&self) -> String {
        format_duration(self.average)
    }

    pub fn median_label(&self) -> String {
        format_duration(self.median)
    }

    pub fn max_label(&self) -> String {
        format_duration(self.max)
    }
}

/// Seconds a task waited (or has been waiting) between queue and start.
///
/// Tasks without a usable queued timestamp have no queue time.
pub fn queue_seconds(task: &Task, now: NaiveDateTime) -> Option<f64> {
    let queued = task.queued_at()?;
    let started = task.started_at().unwrap_or(now);
    let secs = (started - queued).num_milliseconds() as f64 / 1000.0;
    Some(secs.max(0.0))
}

pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Formats seconds as `Hh Mm Ss`, dropping leading zero units.
///
/// Seconds keep one decimal, printed only when non-zero.
pub fn format_duration(secs: f64) -> String {
    let tenths = if secs.is_finite() && secs > 0.0 {
        (secs * 10.0).round() as u64
    } else {
        0
    };
    let hours = tenths / 36_000;
    let minutes = (tenths % 36_000) / 600;
    let rem = tenths % 600;
    let seconds = if rem % 10 == 0 {
        format!("{}", rem / 10)
    } else {
        format!("{}.{}", rem / 10, rem % 10)
    };

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounters {
    pub in_queue: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TaskCounters {
    pub fn from_tasks<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut counters = Self::default();
        for task in tasks {
            match task.status {
                TaskStatus::Queued => counters.in_queue += 1,
                TaskStatus::Running => counters.in_progress += 1,
                TaskStatus::Passed => counters.completed += 1,
                TaskStatus::Failed => {
                    counters.completed += 1;
                    counters.failed += 1;
                }
                TaskStatus::Cancelled | TaskStatus::Deleted => {}
            }
        }
        counters
    }
}
