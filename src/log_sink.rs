// src/log_sink.rs
//
// User-visible connection log. Append-only, optionally timestamped, and always
// scrolled to the newest entry.

use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Format of the per-entry capture timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Log handle shared between the session and the display
pub type SharedLog = Arc<Mutex<LogSink>>;

/// Lock a shared log. A panic while holding the lock cannot leave the entry
/// list half-written, so a poisoned lock is recovered rather than propagated.
pub fn lock_log(log: &SharedLog) -> MutexGuard<'_, LogSink> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One line of the log
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    /// Capture time, present when timestamping was enabled at append time
    pub timestamp: Option<DateTime<Local>>,
    pub text: String,
}

impl LogEntry {
    /// Display form: `[YYYY-MM-DD HH:MM:SS.mmm] text`, surrounding whitespace trimmed
    pub fn render(&self) -> String {
        match self.timestamp {
            Some(ts) => format!("[{}] {}", ts.format(TIMESTAMP_FORMAT), self.text.trim()),
            None => self.text.trim().to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct LogSink {
    entries: Vec<LogEntry>,
    timestamp_enabled: bool,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedLog {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Append an entry after all earlier ones.
    /// The timestamp is taken now, not when the bytes were read.
    pub fn append(&mut self, text: impl Into<String>) {
        let timestamp = self.timestamp_enabled.then(Local::now);
        self.entries.push(LogEntry {
            timestamp,
            text: text.into(),
        });
    }

    /// Affects later appends only.
    pub fn set_timestamp_enabled(&mut self, enabled: bool) {
        self.timestamp_enabled = enabled;
    }

    pub fn timestamp_enabled(&self) -> bool {
        self.timestamp_enabled
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that fit a view of `height` rows.
    ///
    /// The view always follows the newest entry; there is no "stay in place
    /// when scrolled up" mode.
    pub fn visible(&self, height: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(height);
        &self.entries[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut log = LogSink::new();
        log.append("one");
        log.append("two");
        log.append(String::from("three"));

        let texts: Vec<_> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        assert!(log.entries().iter().all(|e| e.timestamp.is_none()));
    }

    #[test]
    fn test_timestamp_toggle_does_not_rewrite_history() {
        let mut log = LogSink::new();
        log.append("plain");
        let before = log.entries().to_vec();

        log.set_timestamp_enabled(true);
        log.append("stamped");
        log.set_timestamp_enabled(false);
        log.append("plain again");

        assert_eq!(&log.entries()[..1], before.as_slice());
        assert!(log.entries()[1].timestamp.is_some());
        assert!(log.entries()[2].timestamp.is_none());
    }

    #[test]
    fn test_render_with_timestamp() {
        let mut log = LogSink::new();
        log.set_timestamp_enabled(true);
        log.append("42\r");

        let rendered = log.entries()[0].render();
        // "[YYYY-MM-DD HH:MM:SS.mmm] 42"
        assert!(rendered.starts_with('['));
        assert_eq!(&rendered[24..26], "] ");
        assert!(rendered.ends_with("] 42"));
    }

    #[test]
    fn test_render_trims_without_timestamp() {
        let mut log = LogSink::new();
        log.append("  hi \r");
        assert_eq!(log.entries()[0].render(), "hi");
    }

    #[test]
    fn test_clear() {
        let mut log = LogSink::new();
        log.append("a");
        log.append("b");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_visible_follows_newest() {
        let mut log = LogSink::new();
        for i in 0..10 {
            log.append(i.to_string());
        }
        let texts: Vec<_> = log.visible(3).iter().map(|e| e.text.clone()).collect();
        assert_eq!(texts, vec!["7", "8", "9"]);

        log.append("10");
        assert_eq!(log.visible(3)[2].text, "10");
        assert_eq!(log.visible(50).len(), 11);
        assert!(log.visible(0).is_empty());
    }
}
