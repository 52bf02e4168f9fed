//! Owns the six feed buffers and the notion of which one is active.
//!
//! Created once at startup with every buffer empty; buffers are populated
//! lazily on first display or explicit refresh and live for the whole
//! session.

use tracing::debug;

use crate::buffer::Buffer;
use crate::feed::FeedKind;
use crate::status::Status;

pub struct BufferStore {
    buffers: Vec<Buffer>,
    active: FeedKind,
}

impl BufferStore {
    pub fn new() -> Self {
        Self {
            buffers: FeedKind::ORDER.iter().map(|&kind| Buffer::new(kind)).collect(),
            active: FeedKind::Home,
        }
    }

    pub fn active_kind(&self) -> FeedKind {
        self.active
    }

    pub fn buffer(&self, kind: FeedKind) -> &Buffer {
        &self.buffers[kind.index()]
    }

    pub fn buffer_mut(&mut self, kind: FeedKind) -> &mut Buffer {
        &mut self.buffers[kind.index()]
    }

    pub fn active(&self) -> &Buffer {
        self.buffer(self.active)
    }

    pub fn active_mut(&mut self) -> &mut Buffer {
        let kind = self.active;
        self.buffer_mut(kind)
    }

    /// Merge a fetched batch into its feed. When the target is the active
    /// buffer the cursor shifts by the prepended count, so the user keeps
    /// looking at the same status. Recounts unread either way.
    pub fn merge(&mut self, kind: FeedKind, batch: Vec<Status>) -> usize {
        let active = self.active == kind;
        let buffer = self.buffer_mut(kind);
        let prepended = buffer.merge(batch);
        if active && prepended > 0 {
            buffer.advance_cursor(prepended);
        }
        buffer.recount_unread(active);
        debug!(
            feed = kind.label(),
            prepended,
            count = buffer.len(),
            unread = buffer.unread(),
            "merged batch"
        );
        prepended
    }

    /// Make `kind` the active buffer, with the view reset to the top.
    pub fn switch_to(&mut self, kind: FeedKind) {
        self.active = kind;
        let buffer = self.active_mut();
        buffer.reset_view();
        buffer.recount_unread(true);
        debug!(feed = kind.label(), "switched buffer");
    }

    /// Move through the fixed feed order by `offset` positions. Landing
    /// outside the order is a no-op, not a wraparound.
    pub fn cycle(&mut self, offset: isize) {
        let index = self.active.index() as isize + offset;
        if (0..FeedKind::ORDER.len() as isize).contains(&index) {
            self.switch_to(FeedKind::ORDER[index as usize]);
        }
    }

    pub fn clear_active(&mut self) {
        self.active_mut().clear();
    }
}

impl Default for BufferStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn batch(ids: &[u64]) -> Vec<Status> {
        ids.iter()
            .map(|&id| Status::new(id, "alice", Utc::now(), format!("status {id}")))
            .collect()
    }

    #[test]
    fn starts_with_all_feeds_empty_and_home_active() {
        let store = BufferStore::new();
        assert_eq!(store.active_kind(), FeedKind::Home);
        for kind in FeedKind::ORDER {
            assert!(store.buffer(kind).is_empty());
        }
    }

    #[test]
    fn merge_into_active_buffer_moves_the_cursor_with_the_content() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Home, batch(&[5, 4]));
        store.active_mut().set_last(1);
        store.active_mut().move_down(); // cursor on id 4

        store.merge(FeedKind::Home, batch(&[7, 6, 5]));
        let home = store.buffer(FeedKind::Home);
        assert_eq!(home.current_status().map(|s| s.id), Some(4));
    }

    #[test]
    fn merge_into_inactive_buffer_leaves_its_cursor_alone() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Mentions, batch(&[5, 4]));
        store.merge(FeedKind::Mentions, batch(&[7, 6, 5]));
        assert_eq!(store.buffer(FeedKind::Mentions).current(), 0);
    }

    #[test]
    fn merge_recounts_unread_per_activity() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Home, batch(&[5, 4]));
        // Active feed: always read.
        assert_eq!(store.buffer(FeedKind::Home).unread(), 0);
        // Background feed without a watermark: everything unread.
        store.merge(FeedKind::Mentions, batch(&[9, 8]));
        assert_eq!(store.buffer(FeedKind::Mentions).unread(), 2);
    }

    #[test]
    fn switch_to_zeroes_unread_and_keeps_other_buffers() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Mentions, batch(&[9, 8]));
        store.merge(FeedKind::Direct, batch(&[3]));
        assert_eq!(store.buffer(FeedKind::Mentions).unread(), 2);
        assert_eq!(store.buffer(FeedKind::Direct).unread(), 1);

        store.switch_to(FeedKind::Mentions);
        assert_eq!(store.active_kind(), FeedKind::Mentions);
        assert_eq!(store.buffer(FeedKind::Mentions).unread(), 0);
        assert_eq!(store.buffer(FeedKind::Direct).unread(), 1);
    }

    #[test]
    fn switch_to_resets_the_view() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Home, batch(&[5, 4, 3]));
        store.active_mut().set_last(2);
        store.active_mut().move_down();
        store.switch_to(FeedKind::Mentions);
        store.switch_to(FeedKind::Home);
        assert_eq!(store.active().current(), 0);
        assert_eq!(store.active().first(), 0);
    }

    #[test]
    fn cycle_moves_through_the_fixed_order() {
        let mut store = BufferStore::new();
        store.cycle(1);
        assert_eq!(store.active_kind(), FeedKind::Mentions);
        store.cycle(2);
        assert_eq!(store.active_kind(), FeedKind::Search);
        store.cycle(-1);
        assert_eq!(store.active_kind(), FeedKind::Direct);
    }

    #[test]
    fn cycle_does_not_wrap() {
        let mut store = BufferStore::new();
        store.cycle(-1);
        assert_eq!(store.active_kind(), FeedKind::Home);
        store.switch_to(FeedKind::Favorite);
        store.cycle(1);
        assert_eq!(store.active_kind(), FeedKind::Favorite);
    }

    #[test]
    fn clear_active_keeps_only_the_newest() {
        let mut store = BufferStore::new();
        store.merge(FeedKind::Home, batch(&[5, 4, 3]));
        store.clear_active();
        let home = store.buffer(FeedKind::Home);
        assert_eq!(home.len(), 1);
        assert_eq!(home.statuses()[0].id, 5);
    }
}
