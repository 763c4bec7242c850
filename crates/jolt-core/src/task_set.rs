use crate::{Task, TaskStatus};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Canonical task collection for one dashboard session.
///
/// Keyed by task id. Iteration follows application order: inserting or
/// replacing a task moves it to the end, so later updates sort after earlier
/// ones. `Deleted` is a removal signal and never stored.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    entries: HashMap<Uuid, (u64, Task)>,
    order: BTreeMap<u64, Uuid>,
    next_seq: u64,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(tasks: Vec<Task>) -> Self {
        let mut set = Self::new();
        set.load_snapshot(tasks);
        set
    }

    pub fn load_snapshot(&mut self, tasks: Vec<Task>) {
        self.entries.clear();
        self.order.clear();
        for task in tasks {
            self.apply_event(task);
        }
    }

    pub fn apply_event(&mut self, task: Task) {
        if task.status == TaskStatus::Deleted {
            self.remove(&task.id);
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some((old_seq, _)) = self.entries.remove(&task.id) {
            self.order.remove(&old_seq);
        }
        self.order.insert(seq, task.id);
        self.entries.insert(task.id, (seq, task));
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Task> {
        let (seq, task) = self.entries.remove(id)?;
        self.order.remove(&seq);
        Some(task)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Task> {
        self.entries.get(id).map(|(_, task)| task)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order
            .values()
            .filter_map(|id| self.entries.get(id).map(|(_, task)| task))
    }
}
