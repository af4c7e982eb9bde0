//! The journal: leveled, timestamped lines appended to every sink and
//! mirrored to the console through `tracing`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use netwatch_core::{LogEntry, LogLevel, Result};
use tracing::{error, info, warn};

/// Destination for journal lines.
pub trait LogSink: Send + Sync {
    fn append(&self, entry: &LogEntry) -> Result<()>;
}

/// Appends lines to a file, creating it if needed.
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{}", entry.line())?;
        Ok(())
    }
}

/// Keeps every entry in memory.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn levels(&self) -> Vec<LogLevel> {
        self.entries().iter().map(|e| e.level).collect()
    }

    /// Messages logged at `level`, in order.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(())
    }
}

/// Fans journal lines out to its sinks.
#[derive(Clone, Default)]
pub struct Journal {
    sinks: Vec<Arc<dyn LogSink>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Write one line. Sink failures are reported but never propagated.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::now(level, message);
        let line = entry.line();

        match level {
            LogLevel::Error => error!(target: "netwatch::journal", "{}", line),
            LogLevel::Warning => warn!(target: "netwatch::journal", "{}", line),
            _ => info!(target: "netwatch::journal", "{}", line),
        }

        for sink in &self.sinks {
            if let Err(e) = sink.append(&entry) {
                warn!("Failed to append journal line: {}", e);
            }
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }
}
