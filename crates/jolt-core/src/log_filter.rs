use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

const LEVEL_MARKER_COLUMN: usize = 27;
const LEVEL_TAG_COLUMNS: std::ops::Range<usize> = 28..35;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Except,
    Debug,
    Verbose,
    Info,
    Error,
    Stdout,
    Stderr,
}

impl LogLevel {
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Except,
        LogLevel::Debug,
        LogLevel::Verbose,
        LogLevel::Info,
        LogLevel::Error,
        LogLevel::Stdout,
        LogLevel::Stderr,
    ];

    pub const DEFAULT_ACTIVE: [LogLevel; 4] = [
        LogLevel::Info,
        LogLevel::Error,
        LogLevel::Stdout,
        LogLevel::Stderr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Except => "EXCEPT",
            LogLevel::Debug => "DEBUG",
            LogLevel::Verbose => "VERBOSE",
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
            LogLevel::Stdout => "STDOUT",
            LogLevel::Stderr => "STDERR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_uppercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| format!("Unknown log level: {}", input.trim()))
    }
}

/// Active level tags for the log viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    active: BTreeSet<LogLevel>,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self::with_levels(LogLevel::DEFAULT_ACTIVE)
    }
}

impl LogFilter {
    pub fn with_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = LogLevel>,
    {
        Self {
            active: levels.into_iter().collect(),
        }
    }

    pub fn set<I>(&mut self, levels: I)
    where
        I: IntoIterator<Item = LogLevel>,
    {
        self.active = levels.into_iter().collect();
    }

    pub fn toggle(&mut self, level: LogLevel) {
        if !self.active.remove(&level) {
            self.active.insert(level);
        }
    }

    pub fn is_active(&self, level: LogLevel) -> bool {
        self.active.contains(&level)
    }

    /// A line passes when its level tag is active, or when it carries no
    /// level marker and stdout is active.
    pub fn matches(&self, line: &str) -> bool {
        let tag = level_tag(line);
        if self.active.iter().any(|level| level.as_str() == tag) {
            return true;
        }
        !has_level_marker(line) && self.is_active(LogLevel::Stdout)
    }

    pub fn apply<'a>(&self, body: &'a str) -> Vec<&'a str> {
        body.split('\n').filter(|line| self.matches(line)).collect()
    }
}

fn level_tag(line: &str) -> String {
    line.chars()
        .skip(LEVEL_TAG_COLUMNS.start)
        .take(LEVEL_TAG_COLUMNS.len())
        .collect::<String>()
        .trim()
        .to_string()
}

fn has_level_marker(line: &str) -> bool {
    line.chars().nth(LEVEL_MARKER_COLUMN) == Some('[')
}
