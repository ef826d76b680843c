//! Duplicate-scan suppression
//!
//! Cameras report the same code many times per second while it stays in
//! frame. The filter remembers only the last raw text and when it was seen;
//! the same text inside the window is dropped.

use chrono::{DateTime, Utc};

/// Default suppression window in milliseconds
pub const DEFAULT_DEDUP_WINDOW_MS: i64 = 5_000;

/// The most recently admitted raw text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastSeen {
    /// Raw scanned text, untrimmed
    pub text: String,
    /// When it was admitted
    pub at: DateTime<Utc>,
}

/// Single-slot duplicate filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateFilter {
    last_seen: Option<LastSeen>,
}

impl DuplicateFilter {
    /// Decide whether `raw` should be processed
    ///
    /// Returns `false` if `raw` equals the stored text and fewer than
    /// `window_ms` milliseconds passed since it was stored. Otherwise the
    /// slot is overwritten with `raw` and `now` and `true` is returned.
    pub fn admit(&mut self, raw: &str, now: DateTime<Utc>, window_ms: i64) -> bool {
        if let Some(last) = &self.last_seen {
            if last.text == raw && (now - last.at).num_milliseconds() < window_ms {
                return false;
            }
        }

        self.last_seen = Some(LastSeen {
            text: raw.to_owned(),
            at: now,
        });
        true
    }

    /// The remembered scan, if any
    #[must_use]
    pub const fn last_seen(&self) -> Option<&LastSeen> {
        self.last_seen.as_ref()
    }
}
