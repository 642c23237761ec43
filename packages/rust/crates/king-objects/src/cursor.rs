//! Continuation cursor for listing mode.

use king_types::CanonicalObjectRecord;

/// Cursor state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CursorState {
    /// Next listing starts from the beginning of the stream
    #[default]
    Start,
    /// Next listing continues after this object id
    Positioned(String),
}

/// Tracks the listing cursor; search responses never touch it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CursorManager {
    state: CursorState,
}

impl CursorManager {
    /// Manager in [`CursorState::Start`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CursorState {
        &self.state
    }

    /// Cursor to send as `after`, if positioned.
    #[must_use]
    pub fn after(&self) -> Option<&str> {
        match &self.state {
            CursorState::Start => None,
            CursorState::Positioned(id) => Some(id),
        }
    }

    /// Advance on a full listing page, otherwise return to start.
    ///
    /// `item_count` is the length of the backend list, before items that
    /// were not objects were dropped; the page is full when it equals
    /// `requested`. The cursor lands on the last record that was kept. A
    /// full page whose last record has no backend id cannot be continued
    /// from, so it also returns to start.
    pub fn observe_listing_page(
        &mut self,
        records: &[CanonicalObjectRecord],
        item_count: usize,
        requested: usize,
    ) {
        self.state = match records.last() {
            Some(last) if item_count == requested && last.has_backend_id() => {
                CursorState::Positioned(last.id.clone())
            }
            _ => CursorState::Start,
        };
    }

    /// Back to start (refresh, filter/target change, search mode).
    pub fn reset(&mut self) {
        self.state = CursorState::Start;
    }
}
