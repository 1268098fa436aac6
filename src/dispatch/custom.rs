//! Change detection for custom text

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Remembers a hash of the last text seen
#[derive(Debug, Default)]
pub struct TextChangeMonitor {
    last_hash: Option<u64>,
}

impl TextChangeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text`; true when it differs from the previous one
    pub fn observe(&mut self, text: &str) -> bool {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let hash = hasher.finish();

        let changed = self.last_hash != Some(hash);
        self.last_hash = Some(hash);
        changed
    }

    pub fn reset(&mut self) {
        self.last_hash = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_changes() {
        let mut monitor = TextChangeMonitor::new();
        assert!(monitor.observe("a"));
        assert!(!monitor.observe("a"));
        assert!(monitor.observe("b"));
        monitor.reset();
        assert!(monitor.observe("b"));
    }
}
