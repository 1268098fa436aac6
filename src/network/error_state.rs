//! Last-error holder shared between the receive thread and the host
//!
//! Only the most recent failure is kept; each new record replaces the
//! previous one. The record is built before the lock is taken, so the
//! lock is only ever held for a swap or a clone.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A recorded failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// One-line description
    pub message: String,
    /// Diagnostic trace: cause chain and context
    pub trace: String,
    pub recorded_at: DateTime<Utc>,
}

/// Mutex-guarded most-recent error
#[derive(Debug, Default)]
pub struct ErrorState {
    last: Mutex<Option<ErrorRecord>>,
    /// Total records ever written
    count: AtomicU64,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current error
    pub fn record(&self, message: impl Into<String>, trace: impl Into<String>) {
        let record = ErrorRecord {
            message: message.into(),
            trace: trace.into(),
            recorded_at: Utc::now(),
        };
        *self.last.lock() = Some(record);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the current error, if any
    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.last.lock().clone()
    }

    /// Current error message
    pub fn message(&self) -> Option<String> {
        self.last.lock().as_ref().map(|r| r.message.clone())
    }

    /// Current diagnostic trace
    pub fn trace(&self) -> Option<String> {
        self.last.lock().as_ref().map(|r| r.trace.clone())
    }

    /// Remove and return the current error
    pub fn take(&self) -> Option<ErrorRecord> {
        self.last.lock().take()
    }

    pub fn clear(&self) {
        self.last.lock().take();
    }

    pub fn has_error(&self) -> bool {
        self.last.lock().is_some()
    }

    /// Number of errors recorded since creation
    pub fn error_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_overwrite_keeps_latest_only() {
        let state = ErrorState::new();
        assert!(!state.has_error());

        state.record("first", "trace 1");
        state.record("second", "trace 2");

        let last = state.last_error().unwrap();
        assert_eq!(last.message, "second");
        assert_eq!(last.trace, "trace 2");
        assert_eq!(state.error_count(), 2);
    }

    #[test]
    fn test_take_clears() {
        let state = ErrorState::new();
        state.record("boom", "");
        assert_eq!(state.take().unwrap().message, "boom");
        assert!(state.take().is_none());
        assert_eq!(state.message(), None);
        assert_eq!(state.error_count(), 1);
    }

    #[test]
    fn test_concurrent_writers_and_reader() {
        let state = Arc::new(ErrorState::new());
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let state = state.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        state.record(format!("writer {t} error {i}"), "");
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            if let Some(record) = state.last_error() {
                assert!(record.message.starts_with("writer "));
            }
        }
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(state.error_count(), 1000);
    }
}
