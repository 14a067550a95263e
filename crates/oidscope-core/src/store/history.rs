// ── Bounded result history ──
//
// Ordered list of operation outcomes with a navigation cursor. At most
// one group streams at a time and it is found by its flag, not by its
// position: single-shot replies may land after it. Completed groups are
// never mutated, and eviction never drops the streaming group.

use std::collections::VecDeque;

use tracing::debug;

use crate::model::{ResultGroup, SnmpResult};

/// Default number of groups kept.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Capped, cursor-navigable store of [`ResultGroup`]s.
#[derive(Debug, Clone)]
pub struct ResultHistory {
    groups: VecDeque<ResultGroup>,
    capacity: usize,
    /// Index of the viewed group; `None` only when empty.
    cursor: Option<usize>,
}

impl Default for ResultHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultHistory {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            groups: VecDeque::with_capacity(capacity),
            capacity,
            cursor: None,
        }
    }

    /// Append a group and move the cursor to it. Returns the evicted
    /// oldest finished group when the history was full.
    pub fn add_group(&mut self, group: ResultGroup) -> Option<ResultGroup> {
        self.groups.push_back(group);
        let evicted = self.evict_overflow();
        self.cursor = Some(self.groups.len() - 1);
        evicted
    }

    /// Extend the streaming group. Returns `false` (and drops the batch)
    /// when there is none.
    pub fn append_results(&mut self, batch: Vec<SnmpResult>) -> bool {
        match self.streaming_mut() {
            Some(group) => {
                group.results.extend(batch);
                true
            }
            None => false,
        }
    }

    /// Close the streaming group, recording `error` if any.
    pub fn finish_stream(&mut self, error: Option<String>) -> bool {
        let Some(group) = self.streaming_mut() else {
            return false;
        };
        group.in_progress = false;
        group.error = error;
        // A history held over capacity for the stream shrinks back now.
        self.evict_overflow();
        true
    }

    pub fn streaming(&self) -> Option<&ResultGroup> {
        self.groups.iter().rev().find(|g| g.in_progress)
    }

    fn streaming_mut(&mut self) -> Option<&mut ResultGroup> {
        self.groups.iter_mut().rev().find(|g| g.in_progress)
    }

    /// Drop the oldest finished group while over capacity. Neither the
    /// streaming group nor the newest group is a candidate, so a history
    /// of capacity one may hold two groups until the stream finishes.
    fn evict_overflow(&mut self) -> Option<ResultGroup> {
        if self.groups.len() <= self.capacity {
            return None;
        }
        let newest = self.groups.len() - 1;
        let index = self
            .groups
            .iter()
            .take(newest)
            .position(|g| !g.in_progress)?;
        let old = self.groups.remove(index)?;
        self.cursor = self.cursor.map(|i| if i > index { i - 1 } else { i });
        debug!(label = %old.label, capacity = self.capacity, "history full, evicted oldest group");
        Some(old)
    }

    pub fn current(&self) -> Option<&ResultGroup> {
        self.cursor.and_then(|i| self.groups.get(i))
    }

    /// Move toward older groups. No-op at the oldest.
    pub fn prev(&mut self) {
        if let Some(i) = self.cursor {
            self.cursor = Some(i.saturating_sub(1));
        }
    }

    /// Move toward newer groups. No-op at the newest.
    pub fn next(&mut self) {
        if let Some(i) = self.cursor {
            if i + 1 < self.groups.len() {
                self.cursor = Some(i + 1);
            }
        }
    }

    /// 1-based position of the cursor for display; 0 when empty.
    pub fn position(&self) -> usize {
        self.cursor.map_or(0, |i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultGroup> {
        self.groups.iter()
    }
}
