//! Bounded in-memory transaction log shown on the dashboard.
//!
//! Every entry is mirrored to `tracing` under the `activity` target, so the
//! rolling log file keeps the full history while the dashboard keeps the tail.

use chrono::{DateTime, Local};
use colored::*;
use core_logic::ACTIVITY_TARGET;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Info,
    Success,
    Error,
    Warn,
    Wait,
    Delay,
    Debug,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub kind: LogKind,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self.kind {
            LogKind::Error => self.message.red(),
            LogKind::Success => self.message.green(),
            LogKind::Warn => self.message.magenta(),
            LogKind::Wait => self.message.yellow(),
            LogKind::Delay => self.message.cyan(),
            LogKind::Debug => self.message.blue(),
            LogKind::Info => self.message.white(),
        };
        write!(f, "[{}] {}", self.at.format("%H:%M:%S").to_string().bright_black(), message)
    }
}

pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    debug: bool,
}

impl ActivityLog {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(debug: bool) -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY, debug)
    }

    pub fn with_capacity(capacity: usize, debug: bool) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
            debug,
        }
    }

    pub fn push(&self, kind: LogKind, message: impl Into<String>) {
        if kind == LogKind::Debug && !self.debug {
            return;
        }
        let message = message.into();

        match kind {
            LogKind::Error => error!(target: ACTIVITY_TARGET, "{}", message),
            LogKind::Warn => warn!(target: ACTIVITY_TARGET, "{}", message),
            LogKind::Debug => debug!(target: ACTIVITY_TARGET, "{}", message),
            _ => info!(target: ACTIVITY_TARGET, "{}", message),
        }

        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            at: Local::now(),
            kind,
            message,
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogKind::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(LogKind::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogKind::Error, message)
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.push(LogKind::Warn, message)
    }

    pub fn wait(&self, message: impl Into<String>) {
        self.push(LogKind::Wait, message)
    }

    pub fn delay(&self, message: impl Into<String>) {
        self.push(LogKind::Delay, message)
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.push(LogKind::Debug, message)
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.message.clone()).collect()
    }

    /// Last `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
