use crate::{Task, TaskStatus};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRow {
    pub worker: String,
    /// Latest-started running task; `None` keeps the worker listed as last seen.
    pub task: Option<Task>,
}

impl WorkerRow {
    fn idle(worker: &str) -> Self {
        Self {
            worker: worker.to_string(),
            task: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    pub fn started(&self) -> &str {
        self.task.as_ref().map(|task| task.started.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerView {
    rows: HashMap<String, WorkerRow>,
}

impl WorkerView {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, worker: &str) -> Option<&WorkerRow> {
        self.rows.get(worker)
    }

    pub fn busy(&self) -> impl Iterator<Item = &WorkerRow> + '_ {
        self.rows.values().filter(|row| row.is_busy())
    }

    pub fn sorted(&self) -> Vec<&WorkerRow> {
        let mut rows: Vec<&WorkerRow> = self.rows.values().collect();
        rows.sort_by(|a, b| a.worker.cmp(&b.worker));
        rows
    }
}

/// Projects tasks into one row per named worker.
///
/// Among a worker's running tasks the one with the latest `Started` wins;
/// on equal timestamps the task seen first is kept. Running tasks without a
/// usable start time never win.
pub fn derive_workers<'a, I>(tasks: I) -> WorkerView
where
    I: IntoIterator<Item = &'a Task>,
{
    let rows = tasks
        .into_iter()
        .filter(|task| task.has_worker())
        .fold(HashMap::new(), |mut rows: HashMap<String, WorkerRow>, task| {
            let row = rows
                .entry(task.worker.clone())
                .or_insert_with(|| WorkerRow::idle(&task.worker));
            if task.status != TaskStatus::Running {
                return rows;
            }
            let Some(started) = task.started_at() else {
                return rows;
            };
            let newer = match row.task.as_ref().and_then(|current| current.started_at()) {
                Some(current) => started > current,
                None => true,
            };
            if newer {
                row.task = Some(task.clone());
            }
            rows
        });
    WorkerView { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn on_worker(id: u128, worker: &str, status: TaskStatus, started: &str) -> Task {
        Task {
            id: Uuid::from_u128(id),
            name: format!("task-{id}"),
            identity: String::new(),
            routing_key: String::new(),
            worker: worker.to_string(),
            status,
            queued: "2024-03-01 09:00:00".to_string(),
            started: started.to_string(),
            ended: String::new(),
            log: String::new(),
        }
    }

    #[test]
    fn later_started_running_task_wins() {
        let tasks = vec![
            on_worker(1, "w1", TaskStatus::Running, "2024-03-01 10:00:00"),
            on_worker(2, "w1", TaskStatus::Running, "2024-03-01 10:05:00"),
        ];
        let view = derive_workers(&tasks);
        let row = view.get("w1").unwrap();
        assert_eq!(row.task.as_ref().map(|task| task.id), Some(Uuid::from_u128(2)));
        assert_eq!(row.started(), "2024-03-01 10:05:00");
    }

    #[test]
    fn earlier_task_kept_on_equal_start() {
        let tasks = vec![
            on_worker(1, "w1", TaskStatus::Running, "2024-03-01 10:00:00"),
            on_worker(2, "w1", TaskStatus::Running, "2024-03-01 10:00:00"),
        ];
        let view = derive_workers(&tasks);
        assert_eq!(
            view.get("w1").and_then(|row| row.task.as_ref()).map(|task| task.id),
            Some(Uuid::from_u128(1))
        );
    }

    #[test]
    fn idle_worker_is_listed_without_task() {
        let tasks = vec![
            on_worker(1, "w1", TaskStatus::Passed, "2024-03-01 10:00:00"),
            on_worker(2, "w2", TaskStatus::Running, "2024-03-01 10:00:00"),
        ];
        let view = derive_workers(&tasks);
        assert_eq!(view.len(), 2);
        let idle = view.get("w1").unwrap();
        assert!(!idle.is_busy());
        assert_eq!(idle.started(), "");
        assert_eq!(view.busy().count(), 1);
    }

    #[test]
    fn unassigned_tasks_are_ignored() {
        let tasks = vec![
            on_worker(1, "", TaskStatus::Queued, ""),
            on_worker(2, "  ", TaskStatus::Running, "2024-03-01 10:00:00"),
        ];
        assert!(derive_workers(&tasks).is_empty());
    }

    #[test]
    fn running_task_without_start_does_not_replace_placeholder() {
        let tasks = vec![on_worker(1, "w1", TaskStatus::Running, "")];
        let view = derive_workers(&tasks);
        assert!(!view.get("w1").unwrap().is_busy());
    }

    #[test]
    fn sorted_orders_rows_by_worker_name() {
        let tasks = vec![
            on_worker(1, "w3", TaskStatus::Queued, ""),
            on_worker(2, "w1", TaskStatus::Queued, ""),
            on_worker(3, "w2", TaskStatus::Queued, ""),
        ];
        let view = derive_workers(&tasks);
        let names: Vec<&str> = view.sorted().iter().map(|row| row.worker.as_str()).collect();
        assert_eq!(names, vec!["w1", "w2", "w3"]);
    }
}
