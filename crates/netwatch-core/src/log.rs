//! Journal entries and their line format.

use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Level tag written at the start of every journal line.
///
/// The three action tags replace `Info` for grow, weaken and hack lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    #[default]
    Info,
    Hack,
    Grow,
    Weaken,
    Scan,
    Error,
    Warning,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Hack => "HACK",
            LogLevel::Grow => "GROW",
            LogLevel::Weaken => "WEAKEN",
            LogLevel::Scan => "SCAN",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp layout used in journal lines.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One journal line before formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    /// Local wall-clock time.
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time.
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Local::now().naive_local(),
            message: message.into(),
        }
    }

    /// `[LEVEL] [YYYY-MM-DD HH:MM:SS] message`
    pub fn line(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.level,
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.message
        )
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}
