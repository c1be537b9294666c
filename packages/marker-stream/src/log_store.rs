// Bounded, filterable marker log
//
// Holds the full insertion-ordered history (capped, oldest evicted first) and
// a derived view of the entries matching the active filter. The view is
// appended to incrementally and rebuilt only when the filter changes.

use crate::types::LogEntry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Pair of case-sensitive substring matchers; a blank matcher matches everything
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterPredicate {
    pub content: String,
    pub stream: String,
}

impl FilterPredicate {
    pub fn new(content: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            stream: stream.into(),
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.content.trim().is_empty() && self.stream.trim().is_empty()
    }

    pub fn matches(&self, entry: &LogEntry) -> bool {
        matches_field(&entry.content, &self.content) && matches_field(&entry.stream_name, &self.stream)
    }
}

fn matches_field(value: &str, pattern: &str) -> bool {
    pattern.trim().is_empty() || value.contains(pattern)
}

/// Capacity-bounded log with a filtered projection
pub struct LogStore {
    capacity: usize,
    history: VecDeque<Arc<LogEntry>>,
    filtered: VecDeque<Arc<LogEntry>>,
    filter: FilterPredicate,
    next_seq: u64,
    total_evicted: u64,
    dirty: bool,
}

impl LogStore {
    /// Create a store keeping at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
            filtered: VecDeque::new(),
            filter: FilterPredicate::default(),
            next_seq: 1,
            total_evicted: 0,
            dirty: false,
        }
    }

    /// Append an entry, evicting the oldest one once the cap is exceeded
    ///
    /// The entry is assigned the next sequence number. Returns true if it passed
    /// the active filter.
    pub fn append(&mut self, mut entry: LogEntry) -> bool {
        entry.seq = self.next_seq;
        self.next_seq += 1;
        let entry = Arc::new(entry);

        self.history.push_back(Arc::clone(&entry));
        if self.history.len() > self.capacity {
            if let Some(evicted) = self.history.pop_front() {
                self.total_evicted += 1;
                // The view is a subsequence, so the oldest entry can only be its front
                if self
                    .filtered
                    .front()
                    .is_some_and(|front| front.seq == evicted.seq)
                {
                    self.filtered.pop_front();
                    self.dirty = true;
                }
            }
        }

        if !self.filter.matches(&entry) {
            return false;
        }

        self.filtered.push_back(entry);
        self.dirty = true;
        true
    }

    /// Replace the active filter and rebuild the view from the full history
    pub fn set_filter(&mut self, filter: FilterPredicate) {
        self.filter = filter;
        self.rebuild();
    }

    pub fn filter(&self) -> &FilterPredicate {
        &self.filter
    }

    /// Empty both the history and the view
    pub fn clear(&mut self) {
        self.history.clear();
        self.filtered.clear();
        self.dirty = true;
    }

    fn rebuild(&mut self) {
        self.filtered = self
            .history
            .iter()
            .filter(|entry| self.filter.matches(entry))
            .cloned()
            .collect();
        self.dirty = true;

        log::debug!(
            "Filtered view rebuilt: {} of {} entries match",
            self.filtered.len(),
            self.history.len()
        );
    }

    /// Returns whether the view changed since the last call, and resets the flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_evicted(&self) -> u64 {
        self.total_evicted
    }

    /// Full history, oldest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.history.iter().map(|e| e.as_ref())
    }

    /// Entries matching the active filter, oldest first
    pub fn filtered_view(&self) -> impl ExactSizeIterator<Item = &LogEntry> + '_ {
        self.filtered.iter().map(|e| e.as_ref())
    }

    /// Entry at `index` in the filtered view, for list widgets binding by row
    pub fn filtered_entry(&self, index: usize) -> Option<&LogEntry> {
        self.filtered.get(index).map(|e| e.as_ref())
    }

    /// Filtered entries appended after sequence number `seq`
    pub fn filtered_since(&self, seq: u64) -> impl Iterator<Item = &LogEntry> + '_ {
        self.filtered
            .iter()
            .map(|e| e.as_ref())
            .filter(move |e| e.seq > seq)
    }
}
