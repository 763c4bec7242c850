use jolt_core::{LiveState, LogLevel, TaskStatus};
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Color = Color::Rgb(146, 131, 116);
pub const ACCENT: Color = Color::Rgb(131, 165, 152);

pub fn zebra_row_style(index: usize) -> Style {
    let bg = if index % 2 == 0 {
        Color::Rgb(18, 20, 26)
    } else {
        Color::Rgb(24, 27, 34)
    };
    Style::new().bg(bg)
}

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Queued => Color::Rgb(250, 189, 47),
        TaskStatus::Running => Color::Rgb(131, 165, 152),
        TaskStatus::Passed => Color::Rgb(184, 187, 38),
        TaskStatus::Failed => Color::Rgb(251, 73, 52),
        TaskStatus::Cancelled => Color::Rgb(214, 93, 14),
        TaskStatus::Deleted => MUTED,
    }
}

pub fn live_state_color(state: LiveState) -> Color {
    match state {
        LiveState::Live => Color::Rgb(184, 187, 38),
        LiveState::Connecting => Color::Rgb(250, 189, 47),
        LiveState::Paused => MUTED,
        LiveState::Disconnected => Color::Rgb(251, 73, 52),
    }
}

pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Except | LogLevel::Error | LogLevel::Stderr => Color::Rgb(251, 73, 52),
        LogLevel::Debug | LogLevel::Verbose => MUTED,
        LogLevel::Info => Color::Rgb(131, 165, 152),
        LogLevel::Stdout => Color::Rgb(235, 219, 178),
    }
}
