use crate::api::ApiClient;
use anyhow::{Context, Result};
use jolt_core::{
    derive_workers, format_duration, now_local, LogFilter, LogLevel, QueueMetrics, Task,
    TaskCounters, TaskSet, TaskStatus, WorkerView,
};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use uuid::Uuid;

async fn load_task_set(api: &ApiClient) -> Result<TaskSet> {
    let tasks = api
        .fetch_tasks()
        .await
        .with_context(|| format!("fetching tasks from {}", api.server()))?;
    Ok(TaskSet::from_snapshot(tasks))
}

pub async fn print_tasks(api: &ApiClient, statuses: &[TaskStatus]) -> Result<()> {
    let tasks = load_task_set(api).await?;
    let filter: BTreeSet<TaskStatus> = if statuses.is_empty() {
        TaskStatus::VISIBLE.into_iter().collect()
    } else {
        statuses.iter().copied().collect()
    };
    print!("{}", render_task_table(&tasks, &filter));
    Ok(())
}

pub async fn print_workers(api: &ApiClient) -> Result<()> {
    let tasks = load_task_set(api).await?;
    print!("{}", render_worker_table(&derive_workers(tasks.iter())));
    Ok(())
}

pub async fn print_metrics(api: &ApiClient) -> Result<()> {
    let tasks = load_task_set(api).await?;
    let metrics = QueueMetrics::compute(tasks.iter(), now_local());
    let counters = TaskCounters::from_tasks(tasks.iter());
    print!("{}", render_metrics(&metrics, &counters));
    Ok(())
}

pub async fn print_statistics(api: &ApiClient) -> Result<()> {
    let stats = api
        .fetch_statistics()
        .await
        .context("fetching statistics")?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

pub async fn print_log(api: &ApiClient, id: Uuid, levels: &[LogLevel]) -> Result<()> {
    let body = api
        .fetch_log(id)
        .await
        .with_context(|| format!("fetching log for task {id}"))?;
    let filter = if levels.is_empty() {
        LogFilter::default()
    } else {
        LogFilter::with_levels(levels.iter().copied())
    };
    for line in filter.apply(&body) {
        println!("{line}");
    }
    Ok(())
}

pub async fn delete(api: &ApiClient, id: Uuid) -> Result<()> {
    api.delete_task(id)
        .await
        .with_context(|| format!("deleting task {id}"))?;
    println!("deleted {id}");
    Ok(())
}

fn render_task_table(tasks: &TaskSet, filter: &BTreeSet<TaskStatus>) -> String {
    let mut rows: Vec<&Task> = tasks
        .iter()
        .filter(|task| filter.contains(&task.status))
        .collect();
    rows.sort_by(|a, b| b.queued_at().cmp(&a.queued_at()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<36}  {:<10}  {:<12}  {:<24}  {:<19}  {:>8}  {}",
        "ID", "STATUS", "WORKER", "NAME", "QUEUED", "DURATION", "LABELS"
    );
    for task in rows {
        let duration = task.duration_secs().map(format_duration).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<36}  {:<10}  {:<12}  {:<24}  {:<19}  {:>8}  {}",
            task.id,
            task.status.as_str(),
            task.worker,
            task.name,
            task.queued,
            duration,
            task.routing_key
        );
    }
    out
}

fn render_worker_table(view: &WorkerView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16}  {:<6}  {:<24}  {}", "WORKER", "STATE", "TASK", "STARTED");
    for row in view.sorted() {
        let (state, name) = match &row.task {
            Some(task) => ("busy", task.name.as_str()),
            None => ("idle", ""),
        };
        let _ = writeln!(
            out,
            "{:<16}  {:<6}  {:<24}  {}",
            row.worker,
            state,
            name,
            row.started()
        );
    }
    out
}

fn render_metrics(metrics: &QueueMetrics, counters: &TaskCounters) -> String {
    format!(
        "queue time  avg {}  median {}  max {}  ({} tasks)\n\
         in queue {}  in progress {}  completed {}  failed {}\n",
        metrics.average_label(),
        metrics.median_label(),
        metrics.max_label(),
        metrics.included,
        counters.in_queue,
        counters.in_progress,
        counters.completed,
        counters.failed,
    )
}
