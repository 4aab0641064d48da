//! In-panel event log and toasts

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use tracing::{error, info, warn};

/// Entries kept unless configured otherwise
pub const DEFAULT_LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Monotonic sequence number, used as the display key
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Non-blocking notice shown over the console
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub level: LogLevel,
    pub message: String,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// Bounded list of user-facing log lines
///
/// Every entry is also emitted through `tracing`.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    next_seq: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) -> &LogEntry {
        let message = message.into();
        match level {
            LogLevel::Info => info!(target: "gemma::event_log", "{}", message),
            LogLevel::Warn => warn!(target: "gemma::event_log", "{}", message),
            LogLevel::Error => error!(target: "gemma::event_log", "{}", message),
        }

        self.entries.push_back(LogEntry {
            seq: self.next_seq,
            timestamp: Utc::now(),
            level,
            message,
        });
        self.next_seq += 1;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        // Just pushed
        &self.entries[self.entries.len() - 1]
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    /// Sequence number of the oldest retained entry
    pub fn first_seq(&self) -> Option<u64> {
        self.entries.front().map(|e| e.seq)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_bounded() {
        let mut log = EventLog::new(3);
        for i in 0..5 {
            log.info(format!("line {}", i));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.first_seq(), Some(2));
        assert_eq!(log.last().map(|e| e.message.as_str()), Some("line 4"));
    }
}
