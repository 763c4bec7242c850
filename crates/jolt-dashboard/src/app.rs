use crate::api::log_url;
use crate::config::Config;
use crate::live::LiveEvent;
use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use jolt_core::{
    derive_workers, now_local, Generation, LiveSession, LogFilter, LogLevel, QueueMetrics,
    ReconnectTicket, Task, TaskCounters, TaskSet, TaskStatus, WorkerView,
};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const LOG_PAGE: u16 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Tasks,
    Workers,
}

impl Mode {
    pub fn title(self) -> &'static str {
        match self {
            Mode::Tasks => "Tasks",
            Mode::Workers => "Workers",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Mode::Tasks => Mode::Workers,
            Mode::Workers => Mode::Tasks,
        }
    }
}

/// Side effects requested by the app; the event loop carries them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartLive(Generation),
    StopLive,
    ScheduleReconnect(ReconnectTicket),
    FetchLog { task_id: Uuid, request: u64 },
    DeleteTask(Uuid),
}

#[derive(Debug)]
pub enum WorkResult {
    LogLoaded {
        task_id: Uuid,
        request: u64,
        body: String,
    },
    DeleteFinished {
        task_id: Uuid,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone)]
pub struct LogView {
    pub task: Task,
    pub url: String,
    pub body: Option<String>,
    pub filter: LogFilter,
    pub scroll: u16,
    request: u64,
}

impl LogView {
    pub fn is_loading(&self) -> bool {
        self.body.is_none()
    }

    pub fn lines(&self) -> Vec<&str> {
        self.body
            .as_deref()
            .map(|body| self.filter.apply(body))
            .unwrap_or_default()
    }
}

pub struct App {
    pub config: Config,
    pub session: LiveSession,
    pub tasks: TaskSet,
    pub workers: WorkerView,
    pub counters: TaskCounters,
    pub metrics: QueueMetrics,
    pub status_filter: BTreeSet<TaskStatus>,
    pub mode: Mode,
    pub selected: usize,
    pub log_view: Option<LogView>,
    pub help_open: bool,
    pub status_note: Option<String>,
    next_request: u64,
    effects: Vec<Effect>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let session = LiveSession::new(config.reconnect_delay);
        Self {
            config,
            session,
            tasks: TaskSet::new(),
            workers: WorkerView::default(),
            counters: TaskCounters::default(),
            metrics: QueueMetrics::default(),
            status_filter: TaskStatus::VISIBLE.into_iter().collect(),
            mode: Mode::Tasks,
            selected: 0,
            log_view: None,
            help_open: false,
            status_note: None,
            next_request: 0,
            effects: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        if let Some(generation) = self.session.connect() {
            self.effects.push(Effect::StartLive(generation));
        }
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn apply_live_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::StreamOpened { generation } => {
                if self.session.stream_opened(generation) {
                    self.status_note = None;
                }
            }
            LiveEvent::Snapshot { generation, result } => {
                if !self.session.snapshot_settled(generation) {
                    return;
                }
                match result {
                    Ok(tasks) => {
                        info!("snapshot_loaded: {} tasks", tasks.len());
                        self.tasks.load_snapshot(tasks);
                    }
                    Err(err) => {
                        self.status_note = Some(format!("snapshot unavailable: {err}"));
                    }
                }
                self.tasks_changed();
                self.refresh_metrics(now_local());
            }
            LiveEvent::Task { generation, task } => {
                if !self.session.accepts_events(generation) {
                    return;
                }
                self.tasks.apply_event(task);
                self.tasks_changed();
            }
            LiveEvent::StreamClosed { generation } => {
                if let Some(ticket) = self.session.stream_failed(generation) {
                    warn!("live_stream_lost: {generation}");
                    self.status_note = Some(format!(
                        "stream lost, reconnecting in {}s",
                        ticket.delay.as_secs()
                    ));
                    self.effects.push(Effect::ScheduleReconnect(ticket));
                }
            }
            LiveEvent::ReconnectDue { generation } => {
                if let Some(next) = self.session.reconnect_due(generation) {
                    info!("live_reconnect: {next}");
                    self.effects.push(Effect::StartLive(next));
                }
            }
        }
    }

    pub fn apply_work_result(&mut self, result: WorkResult) {
        match result {
            WorkResult::LogLoaded {
                task_id,
                request,
                body,
            } => {
                if let Some(view) = self.log_view.as_mut() {
                    if view.request == request && view.task.id == task_id {
                        view.body = Some(body);
                        view.scroll = 0;
                    }
                }
            }
            WorkResult::DeleteFinished { task_id, result } => match result {
                Ok(()) => {
                    self.tasks.remove(&task_id);
                    if self
                        .log_view
                        .as_ref()
                        .is_some_and(|view| view.task.id == task_id)
                    {
                        self.log_view = None;
                    }
                    self.tasks_changed();
                    self.status_note = Some(format!("deleted {task_id}"));
                }
                Err(err) => {
                    self.status_note = Some(format!("delete failed: {err}"));
                }
            },
        }
    }

    pub fn refresh_metrics(&mut self, now: NaiveDateTime) {
        self.metrics = QueueMetrics::compute(self.tasks.iter(), now);
    }

    /// Delay until the next metrics refresh. Metrics keep ticking through
    /// reconnects and stop only while paused.
    pub fn metrics_interval(&self) -> Option<Duration> {
        if self.session.is_paused() {
            None
        } else {
            Some(self.metrics.refresh_interval())
        }
    }

    fn tasks_changed(&mut self) {
        self.workers = derive_workers(self.tasks.iter());
        self.counters = TaskCounters::from_tasks(self.tasks.iter());
        if let Some(view) = self.log_view.as_mut() {
            if let Some(task) = self.tasks.get(&view.task.id) {
                view.task = task.clone();
            }
        }
        self.clamp_selection();
    }

    /// Tasks passing the status filter, newest `Queued` first.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        let mut rows: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| self.status_filter.contains(&task.status))
            .collect();
        rows.sort_by(|a, b| b.queued_at().cmp(&a.queued_at()));
        rows
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.visible_tasks().get(self.selected).copied()
    }

    fn clamp_selection(&mut self) {
        let count = self.visible_tasks().len();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }

    pub fn move_selection(&mut self, delta: i32) {
        let count = self.visible_tasks().len();
        if count == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as i64 + delta as i64).clamp(0, count as i64 - 1);
        self.selected = next as usize;
    }

    pub fn toggle_status_filter(&mut self, status: TaskStatus) {
        if !self.status_filter.remove(&status) {
            self.status_filter.insert(status);
        }
        self.clamp_selection();
    }

    pub fn toggle_pause(&mut self) {
        if self.session.is_paused() {
            if let Some(generation) = self.session.resume() {
                info!("live_resume: {generation}");
                self.status_note = Some("live updates resumed".to_string());
                self.effects.push(Effect::StartLive(generation));
            }
        } else if self.session.pause() {
            info!("live_pause");
            self.status_note = Some("live updates paused".to_string());
            self.effects.push(Effect::StopLive);
        }
    }

    pub fn open_log_for_selected(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        if !task.has_log() {
            self.status_note = Some(format!("no log recorded for {}", task.name));
            return;
        }
        let url = log_url(&self.config.server, task.id)
            .map(|url| url.to_string())
            .unwrap_or_default();
        let request = self.next_request();
        self.effects.push(Effect::FetchLog {
            task_id: task.id,
            request,
        });
        self.log_view = Some(LogView {
            task,
            url,
            body: None,
            filter: LogFilter::default(),
            scroll: 0,
            request,
        });
    }

    pub fn reload_log(&mut self) {
        let request = self.next_request();
        if let Some(view) = self.log_view.as_mut() {
            view.request = request;
            view.body = None;
            self.effects.push(Effect::FetchLog {
                task_id: view.task.id,
                request,
            });
        }
    }

    pub fn close_log(&mut self) {
        self.log_view = None;
    }

    pub fn toggle_log_level(&mut self, level: LogLevel) {
        if let Some(view) = self.log_view.as_mut() {
            view.filter.toggle(level);
            view.scroll = 0;
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(task) = self.selected_task() {
            let id = task.id;
            self.status_note = Some(format!("deleting {}", task.name));
            self.effects.push(Effect::DeleteTask(id));
        }
    }

    fn next_request(&mut self) -> u64 {
        self.next_request = self.next_request.wrapping_add(1);
        self.next_request
    }

    /// Returns true when the dashboard should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        if matches!(key.code, KeyCode::Char('?') | KeyCode::F(1)) {
            self.help_open = !self.help_open;
            return false;
        }
        if self.help_open {
            if key.code == KeyCode::Esc {
                self.help_open = false;
            }
            return false;
        }
        if self.log_view.is_some() {
            self.handle_log_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('1') => self.mode = Mode::Tasks,
            KeyCode::Char('2') => self.mode = Mode::Workers,
            KeyCode::Tab => self.mode = self.mode.next(),
            KeyCode::Char('p') | KeyCode::Char(' ') => self.toggle_pause(),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter | KeyCode::Char('l') if self.mode == Mode::Tasks => {
                self.open_log_for_selected()
            }
            KeyCode::Char('x') if self.mode == Mode::Tasks => self.delete_selected(),
            KeyCode::Char('Q') => self.toggle_status_filter(TaskStatus::Queued),
            KeyCode::Char('R') => self.toggle_status_filter(TaskStatus::Running),
            KeyCode::Char('P') => self.toggle_status_filter(TaskStatus::Passed),
            KeyCode::Char('F') => self.toggle_status_filter(TaskStatus::Failed),
            KeyCode::Char('C') => self.toggle_status_filter(TaskStatus::Cancelled),
            _ => {}
        }
        false
    }

    fn handle_log_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_log(),
            KeyCode::Char('r') => self.reload_log(),
            KeyCode::Char(digit @ '1'..='7') => {
                let index = digit as usize - '1' as usize;
                self.toggle_log_level(LogLevel::ALL[index]);
            }
            KeyCode::Down | KeyCode::Char('j') => self.scroll_log(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_log(-1),
            KeyCode::PageDown => self.scroll_log(LOG_PAGE as i32),
            KeyCode::PageUp => self.scroll_log(-(LOG_PAGE as i32)),
            _ => {}
        }
    }

    fn scroll_log(&mut self, delta: i32) {
        if let Some(view) = self.log_view.as_mut() {
            let max = view.lines().len().saturating_sub(1) as i64;
            let next = (view.scroll as i64 + delta as i64).clamp(0, max.min(u16::MAX as i64));
            view.scroll = next as u16;
        }
    }
}
