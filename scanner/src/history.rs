//! Bounded session log of finished scans, newest first

use crate::types::ScanHistoryEntry;
use std::collections::VecDeque;

/// Default number of rows kept
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Newest-first scan log that evicts the oldest row past its limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHistory {
    entries: VecDeque<ScanHistoryEntry>,
    limit: usize,
}

impl ScanHistory {
    /// Empty history keeping at most `limit` rows
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Prepend a row, evicting the oldest if over the limit
    pub fn push(&mut self, entry: ScanHistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    /// Remove every row
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rows, newest first
    pub fn iter(&self) -> impl Iterator<Item = &ScanHistoryEntry> {
        self.entries.iter()
    }

    /// Row at `index` (0 is the newest)
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ScanHistoryEntry> {
        self.entries.get(index)
    }

    /// Most recent row
    #[must_use]
    pub fn newest(&self) -> Option<&ScanHistoryEntry> {
        self.entries.front()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of rows
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for ScanHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}
