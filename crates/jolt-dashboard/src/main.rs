mod api;
mod app;
mod commands;
mod config;
mod live;
mod logging;
mod theme;
mod ui;

use crate::api::ApiClient;
use crate::app::{App, Effect, WorkResult};
use crate::config::{load_config, Config, ConfigOverrides};
use crate::live::{schedule_reconnect, LiveEvent, LiveHandle};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use jolt_core::{now_local, LogLevel, TaskStatus};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

const LIVE_QUEUE_CAPACITY: usize = 256;
const WORK_QUEUE_CAPACITY: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "jolt-dashboard")]
#[command(about = "Live dashboard for the jolt task queue", long_about = None)]
struct Cli {
    /// Backend base URL (falls back to JOLT_SERVER)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Directory for the dashboard log file (falls back to JOLT_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    debug: bool,
    /// Seconds to wait before reconnecting a dropped event stream
    #[arg(long, global = true, default_value_t = 10)]
    reconnect_secs: u64,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Live terminal dashboard (default)
    Watch,
    /// Print the task table once
    Tasks {
        #[arg(long = "status")]
        statuses: Vec<TaskStatus>,
    },
    /// Print the worker view once
    Workers,
    /// Print queue-time metrics and counters once
    Metrics,
    /// Print backend statistics as JSON
    Stats,
    /// Print a task's log
    Log {
        id: Uuid,
        #[arg(long = "filter")]
        levels: Vec<LogLevel>,
    },
    /// Delete a task
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        server: cli.server,
        log_dir: cli.log_dir,
        debug: cli.debug,
        reconnect_secs: cli.reconnect_secs,
    };
    let config = load_config(&overrides).context("resolving configuration")?;
    let command = cli.command.unwrap_or(Command::Watch);
    logging::init_logging(&config, matches!(command, Command::Watch));

    let api = ApiClient::new(config.server.clone()).context("building http client")?;
    match command {
        Command::Watch => run_dashboard(config, api).await,
        Command::Tasks { statuses } => commands::print_tasks(&api, &statuses).await,
        Command::Workers => commands::print_workers(&api).await,
        Command::Metrics => commands::print_metrics(&api).await,
        Command::Stats => commands::print_statistics(&api).await,
        Command::Log { id, levels } => commands::print_log(&api, id, &levels).await,
        Command::Delete { id } => commands::delete(&api, id).await,
    }
}

async fn run_dashboard(config: Config, api: ApiClient) -> Result<()> {
    let (live_tx, mut live_rx) = mpsc::channel(LIVE_QUEUE_CAPACITY);
    let (work_tx, mut work_rx) = mpsc::channel(WORK_QUEUE_CAPACITY);
    info!("dashboard_start: {}", config.server);
    let mut app = App::new(config);
    let mut runner = EffectRunner::new(api, live_tx, work_tx);
    app.start();

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app, &mut runner, &mut live_rx, &mut work_rx).await;
    restore_terminal(&mut terminal)?;
    runner.shutdown();
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    runner: &mut EffectRunner,
    live_rx: &mut mpsc::Receiver<LiveEvent>,
    work_rx: &mut mpsc::Receiver<WorkResult>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut next_metrics = Instant::now();

    loop {
        for effect in app.take_effects() {
            runner.run(effect);
        }
        terminal.draw(|frame| ui::render(frame, app))?;

        let metrics_interval = app.metrics_interval();
        tokio::select! {
            _ = tokio::time::sleep_until(next_metrics), if metrics_interval.is_some() => {
                app.refresh_metrics(now_local());
                if let Some(interval) = app.metrics_interval() {
                    next_metrics = Instant::now() + interval;
                }
            }
            Some(event) = live_rx.recv() => {
                app.apply_live_event(event);
            }
            Some(result) = work_rx.recv() => {
                app.apply_work_result(result);
            }
            maybe_event = events.next() => match maybe_event {
                Some(Ok(Event::Key(key))) => {
                    if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat)
                        && app.handle_key(key)
                    {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            }
        }
    }
}

/// Carries out the app's requested effects on spawned tasks.
struct EffectRunner {
    api: ApiClient,
    live_tx: mpsc::Sender<LiveEvent>,
    work_tx: mpsc::Sender<WorkResult>,
    live: LiveHandle,
}

impl EffectRunner {
    fn new(
        api: ApiClient,
        live_tx: mpsc::Sender<LiveEvent>,
        work_tx: mpsc::Sender<WorkResult>,
    ) -> Self {
        Self {
            api,
            live_tx,
            work_tx,
            live: LiveHandle::default(),
        }
    }

    fn run(&mut self, effect: Effect) {
        match effect {
            Effect::StartLive(generation) => {
                self.live
                    .start(self.api.clone(), generation, self.live_tx.clone());
            }
            Effect::StopLive => self.live.stop(),
            Effect::ScheduleReconnect(ticket) => {
                schedule_reconnect(ticket, self.live_tx.clone());
            }
            Effect::FetchLog { task_id, request } => {
                let api = self.api.clone();
                let tx = self.work_tx.clone();
                tokio::spawn(async move {
                    let body = match api.fetch_log(task_id).await {
                        Ok(body) => body,
                        Err(err) => {
                            warn!("log_fetch_error: {err}");
                            String::new()
                        }
                    };
                    let _ = tx
                        .send(WorkResult::LogLoaded {
                            task_id,
                            request,
                            body,
                        })
                        .await;
                });
            }
            Effect::DeleteTask(task_id) => {
                let api = self.api.clone();
                let tx = self.work_tx.clone();
                tokio::spawn(async move {
                    let result = api.delete_task(task_id).await.map_err(|err| {
                        warn!("task_delete_error: {err}");
                        err.to_string()
                    });
                    let _ = tx
                        .send(WorkResult::DeleteFinished { task_id, result })
                        .await;
                });
            }
        }
    }

    fn shutdown(&mut self) {
        self.live.stop();
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_defaults_to_watch() {
        let cli = Cli::try_parse_from(["jolt-dashboard"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.reconnect_secs, 10);
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "jolt-dashboard",
            "tasks",
            "--status",
            "failed",
            "--status",
            "Running",
            "--server",
            "http://ci:8080",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://ci:8080"));
        match cli.command {
            Some(Command::Tasks { statuses }) => {
                assert_eq!(statuses, vec![TaskStatus::Failed, TaskStatus::Running]);
            }
            other => panic!("expected tasks command, got {other:?}"),
        }
    }

    #[test]
    fn log_command_parses_id_and_filters() {
        let cli = Cli::try_parse_from([
            "jolt-dashboard",
            "log",
            "00000000-0000-0000-0000-000000000007",
            "--filter",
            "stderr",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Log { id, levels }) => {
                assert_eq!(id, Uuid::from_u128(7));
                assert_eq!(levels, vec![LogLevel::Stderr]);
            }
            other => panic!("expected log command, got {other:?}"),
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Cli::try_parse_from(["jolt-dashboard", "tasks", "--status", "exploded"]).is_err());
    }
}
