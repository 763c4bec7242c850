use crate::app::{App, LogView, Mode};
use crate::theme;
use jolt_core::{format_duration, LogLevel, Task, TaskStatus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, chunks[0]);
    match (&app.log_view, app.mode) {
        (Some(view), _) => render_log(f, view, chunks[1]),
        (None, Mode::Tasks) => render_tasks(f, app, chunks[1]),
        (None, Mode::Workers) => render_workers(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);

    if app.help_open {
        render_help(f, centered_rect(60, 70, f.size()));
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = app.session.state();
    let counters = app.counters;
    let metrics = &app.metrics;

    let status_line = Line::from(vec![
        Span::styled("jolt ", theme::HEADER_STYLE),
        Span::styled(app.config.server.as_str(), Style::default().fg(theme::MUTED)),
        Span::raw("  "),
        Span::styled(
            state.label(),
            Style::default()
                .fg(theme::live_state_color(state))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            app.status_note.clone().unwrap_or_default(),
            Style::default().fg(theme::MUTED),
        ),
    ]);
    let kpi_line = Line::from(vec![
        kpi("In queue", counters.in_queue, theme::status_color(TaskStatus::Queued)),
        kpi(
            "In progress",
            counters.in_progress,
            theme::status_color(TaskStatus::Running),
        ),
        kpi("Completed", counters.completed, theme::status_color(TaskStatus::Passed)),
        kpi("Failed", counters.failed, theme::status_color(TaskStatus::Failed)),
    ]);
    let queue_line = Line::from(vec![
        Span::styled("Queue time  ", Style::default().fg(theme::MUTED)),
        Span::raw(format!("avg {}  ", metrics.average_label())),
        Span::raw(format!("median {}  ", metrics.median_label())),
        Span::raw(format!("max {}", metrics.max_label())),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme::MUTED));
    f.render_widget(
        Paragraph::new(vec![status_line, kpi_line, queue_line]).block(block),
        area,
    );
}

fn kpi(label: &str, value: usize, color: Color) -> Span<'static> {
    Span::styled(
        format!("{label}: {value}   "),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn render_tasks(f: &mut Frame, app: &App, area: Rect) {
    let tasks = app.visible_tasks();
    let rows: Vec<Row> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| task_row(task).style(theme::zebra_row_style(index)))
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Min(16),
        Constraint::Length(14),
        Constraint::Length(19),
        Constraint::Length(19),
        Constraint::Length(19),
        Constraint::Length(10),
        Constraint::Length(10),
    ];

    let filters: Vec<&str> = TaskStatus::VISIBLE
        .iter()
        .filter(|status| app.status_filter.contains(status))
        .map(|status| status.as_str())
        .collect();
    let title = format!(
        "{} ({}) [{}]",
        Mode::Tasks.title(),
        tasks.len(),
        filters.join(" ")
    );

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec![
                "Labels", "Worker", "Name", "Identity", "Queued", "Started", "Finished",
                "Duration", "Status",
            ])
            .style(theme::HEADER_STYLE),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(theme::SELECTED_STYLE);

    let mut state = TableState::default();
    if !tasks.is_empty() {
        state.select(Some(app.selected));
    }
    f.render_stateful_widget(table, area, &mut state);
}

fn task_row(task: &Task) -> Row<'static> {
    let duration = task.duration_secs().map(format_duration).unwrap_or_default();
    Row::new(vec![
        Cell::from(task.routing_key.clone()),
        Cell::from(task.worker.clone()),
        Cell::from(task.name.clone()),
        Cell::from(task.identity.clone()),
        Cell::from(task.queued.clone()),
        Cell::from(task.started.clone()),
        Cell::from(task.ended.clone()),
        Cell::from(duration),
        Cell::from(Span::styled(
            task.status.as_str(),
            Style::default().fg(theme::status_color(task.status)),
        )),
    ])
}

fn render_workers(f: &mut Frame, app: &App, area: Rect) {
    let workers = app.workers.sorted();
    let rows: Vec<Row> = workers
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let (name, identity, state) = match &row.task {
                Some(task) => (
                    task.name.clone(),
                    task.identity.clone(),
                    Span::styled("busy", Style::default().fg(theme::status_color(task.status))),
                ),
                None => (
                    String::new(),
                    String::new(),
                    Span::styled("idle", Style::default().fg(theme::MUTED)),
                ),
            };
            Row::new(vec![
                Cell::from(row.worker.clone()),
                Cell::from(state),
                Cell::from(name),
                Cell::from(identity),
                Cell::from(row.started().to_string()),
            ])
            .style(theme::zebra_row_style(index))
        })
        .collect();

    let widths = [
        Constraint::Length(16),
        Constraint::Length(6),
        Constraint::Min(16),
        Constraint::Length(16),
        Constraint::Length(19),
    ];
    let title = format!(
        "{} ({} busy / {})",
        Mode::Workers.title(),
        app.workers.busy().count(),
        workers.len()
    );
    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["Worker", "State", "Task", "Identity", "Started"])
                .style(theme::HEADER_STYLE),
        )
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(table, area);
}

fn render_log(f: &mut Frame, view: &LogView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)])
        .split(area);

    let task = &view.task;
    let muted = Style::default().fg(theme::MUTED);
    let mut filter_spans = vec![Span::styled("Filter ", muted)];
    for (index, level) in LogLevel::ALL.iter().enumerate() {
        let style = if view.filter.is_active(*level) {
            Style::default()
                .fg(theme::level_color(*level))
                .add_modifier(Modifier::BOLD)
        } else {
            muted.add_modifier(Modifier::DIM)
        };
        filter_spans.push(Span::styled(format!("{}:{} ", index + 1, level), style));
    }
    let details = vec![
        Line::from(vec![
            Span::styled(task.name.clone(), theme::HEADER_STYLE),
            Span::raw("  "),
            Span::styled(task.identity.clone(), muted),
            Span::raw("  "),
            Span::styled(
                task.status.as_str(),
                Style::default().fg(theme::status_color(task.status)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Started ", muted),
            Span::raw(task.started.clone()),
            Span::styled("  Ended ", muted),
            Span::raw(task.ended.clone()),
        ]),
        Line::from(vec![Span::styled("Open ", muted), Span::raw(view.url.clone())]),
        Line::from(filter_spans),
    ];
    f.render_widget(
        Paragraph::new(details).block(Block::default().borders(Borders::BOTTOM)),
        chunks[0],
    );

    let body: Vec<Line> = if view.is_loading() {
        vec![Line::from(Span::styled("loading...", muted))]
    } else {
        view.lines()
            .into_iter()
            .map(|line| Line::from(line.to_string()))
            .collect()
    };
    let paragraph = Paragraph::new(body)
        .block(Block::default().borders(Borders::ALL).title("Log"))
        .scroll((view.scroll, 0));
    f.render_widget(paragraph, chunks[1]);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let hint = if app.log_view.is_some() {
        "esc close  r reload  1-7 toggle level  j/k scroll  ? help"
    } else {
        "q quit  tab view  p pause  enter log  x delete  Q/R/P/F/C filter  ? help"
    };
    f.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(theme::MUTED))),
        area,
    );
}

fn render_help(f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help")
        .border_style(Style::default().fg(Color::Yellow));

    let entries = [
        ("1 / 2 / Tab", "Tasks or workers view"),
        ("j / k", "Move selection"),
        ("p / Space", "Pause or resume live updates"),
        ("Enter / l", "Open task log"),
        ("x", "Delete selected task"),
        ("Q R P F C", "Toggle Queued, Running, Passed, Failed, Cancelled"),
        ("r", "Reload log (log view)"),
        ("1-7", "Toggle log level (log view)"),
        ("Esc", "Close log or help"),
        ("q", "Quit"),
    ];
    let mut text = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    text.extend(entries.iter().map(|(keys, action)| {
        Line::from(vec![
            Span::styled(format!("{keys:<12}"), Style::default().fg(theme::ACCENT)),
            Span::raw(*action),
        ])
    }));

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
