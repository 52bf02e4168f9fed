//! One named feed: an ordered sequence of statuses plus the cursor, scroll
//! window and read watermark that belong to it.

use crate::feed::FeedKind;
use crate::status::Status;

/// A single scrollable feed. Statuses are newest-first with unique ids.
///
/// Field invariants: `first <= current`, and after a render pass
/// `current <= last` unless the cursor was just clamped back. The active
/// buffer's `unread` is always zero.
#[derive(Debug)]
pub struct Buffer {
    kind: FeedKind,
    statuses: Vec<Status>,
    /// Cursor: index of the highlighted status.
    current: usize,
    /// Index of the status at the top of the scroll window.
    first: usize,
    /// Bottom-most index painted during the last render pass.
    last: usize,
    /// Id of the newest status seen the last time this feed was displayed.
    last_read: Option<u64>,
    unread: usize,
}

impl Buffer {
    pub fn new(kind: FeedKind) -> Self {
        Self {
            kind,
            statuses: Vec::new(),
            current: 0,
            first: 0,
            last: 0,
            last_read: None,
            unread: 0,
        }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn statuses(&self) -> &[Status] {
        &self.statuses
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn last_read(&self) -> Option<u64> {
        self.last_read
    }

    pub fn current_status(&self) -> Option<&Status> {
        self.statuses.get(self.current)
    }

    /// Merge a freshly fetched batch (newest-first) into this feed.
    ///
    /// Returns the number of items prepended ahead of the existing head,
    /// which is also how far the cursor must shift to stay on the same
    /// logical status. Adopting a batch into an empty feed returns 0: the
    /// cursor has nothing to keep pointing at.
    ///
    /// A batch sharing no id with the feed is dropped whole; without a
    /// confirmed overlap, prepending would risk duplicate insertion on the
    /// next refresh.
    pub fn merge(&mut self, batch: Vec<Status>) -> usize {
        if batch.is_empty() {
            return 0;
        }
        if self.statuses.is_empty() {
            self.statuses = batch;
            return 0;
        }
        let newest = self.statuses[0].id;
        if batch[0].id == newest {
            return 0;
        }
        match batch.iter().position(|status| status.id == newest) {
            Some(overlap) => {
                self.statuses.splice(0..0, batch.into_iter().take(overlap));
                overlap
            }
            None => 0,
        }
    }

    /// Shift the cursor forward after a merge into the active buffer, so it
    /// stays on the status the user was viewing.
    pub fn advance_cursor(&mut self, by: usize) {
        self.current += by;
    }

    /// Recompute the unread count against the watermark. Everything newer
    /// than `last_read` counts; a missing or stale watermark counts all.
    /// Being displayed implies being read, so the active buffer holds zero.
    pub fn recount_unread(&mut self, active: bool) {
        if active {
            self.unread = 0;
            return;
        }
        let mut unread = 0;
        for status in &self.statuses {
            if Some(status.id) == self.last_read {
                break;
            }
            unread += 1;
        }
        self.unread = unread;
    }

    /// Advance the watermark to the newest status. Called when this feed is
    /// the one actively rendered, never on a background merge.
    pub fn mark_read(&mut self) {
        if let Some(newest) = self.statuses.first() {
            self.last_read = Some(newest.id);
        }
        self.unread = 0;
    }

    pub fn move_down(&mut self) {
        if self.current + 1 < self.statuses.len() {
            if self.current >= self.last {
                self.first += 1;
            }
            self.current += 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.current > 0 {
            if self.current == self.first {
                self.first -= 1;
            }
            self.current -= 1;
        }
    }

    /// Put the cursor and scroll window back at the top (buffer switch).
    pub fn reset_view(&mut self) {
        self.current = 0;
        self.first = 0;
    }

    /// Record the bottom-most painted index for this render pass.
    pub fn set_last(&mut self, index: usize) {
        self.last = index;
    }

    /// Pull the cursor back to the last status that fit on screen.
    pub fn clamp_to_last(&mut self) {
        self.current = self.last;
    }

    /// Collapse the feed to just its newest status.
    pub fn clear(&mut self) {
        self.statuses.truncate(1);
        self.current = 0;
        self.first = 0;
    }
}
