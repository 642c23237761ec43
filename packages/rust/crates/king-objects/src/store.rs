//! Object store: the materialized page plus the request-generation guard.
//!
//! Every fetch takes a [`FetchTicket`]; only the ticket of the newest
//! issued fetch may apply its result. Older responses are dropped.

use king_types::{CanonicalObjectRecord, ObjectPage};

/// Generation stamp handed out when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

impl FetchTicket {
    /// Generation this ticket belongs to.
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of applying a fetch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Store updated
    Applied,
    /// A newer fetch was issued meanwhile; nothing changed
    Stale,
}

/// Latest materialized page; replaced atomically, never merged.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    page: ObjectPage,
    generation: u64,
    last_error: Option<String>,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new(king_types::DEFAULT_DISPLAY_PAGE_SIZE)
    }
}

impl ObjectStore {
    /// Empty store with the given display page size.
    #[must_use]
    pub fn new(display_page_size: usize) -> Self {
        Self {
            page: ObjectPage {
                page_size: display_page_size.max(1),
                ..ObjectPage::default()
            },
            generation: 0,
            last_error: None,
        }
    }

    /// Issue a ticket; all earlier tickets become stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
        }
    }

    /// Make every outstanding ticket stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// True when `ticket` is the newest issued.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace records and total in one step. The display window is kept,
    /// its index clamped to the new page count.
    pub fn replace(
        &mut self,
        ticket: FetchTicket,
        records: Vec<CanonicalObjectRecord>,
    ) -> ApplyOutcome {
        if !self.is_current(ticket) {
            return ApplyOutcome::Stale;
        }
        let window = (self.page.page_index, self.page.page_size);
        self.page = ObjectPage {
            page_index: window.0,
            page_size: window.1,
            ..ObjectPage::from_records(records)
        };
        self.page.page_index = self.page.page_index.clamp(1, self.page.page_count());
        self.last_error = None;
        ApplyOutcome::Applied
    }

    /// Record a failed fetch. The page stays at its last good state.
    pub fn fail(&mut self, ticket: FetchTicket, message: impl Into<String>) -> ApplyOutcome {
        if !self.is_current(ticket) {
            return ApplyOutcome::Stale;
        }
        self.last_error = Some(message.into());
        ApplyOutcome::Applied
    }

    /// Drop everything for a new target; in-flight fetches become stale.
    pub fn clear(&mut self) {
        self.invalidate();
        let page_size = self.page.page_size;
        self.page = ObjectPage {
            page_size,
            ..ObjectPage::default()
        };
        self.last_error = None;
    }

    /// Current page.
    #[must_use]
    pub fn page(&self) -> &ObjectPage {
        &self.page
    }

    /// Message of the last failed fetch, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Move the display window (1-based, clamped).
    pub fn set_page_index(&mut self, page_index: usize) {
        self.page.page_index = page_index.clamp(1, self.page.page_count());
    }

    /// Change rows per display page; returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page.page_size = page_size.max(1);
        self.page.page_index = 1;
    }

    /// Back to the first display page.
    pub fn reset_window(&mut self) {
        self.page.page_index = 1;
    }

    /// Case-insensitive local search over id and property JSON.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&CanonicalObjectRecord> {
        let needle = query.trim().to_lowercase();
        self.page
            .records
            .iter()
            .filter(|record| {
                needle.is_empty()
                    || record.id.to_lowercase().contains(&needle)
                    || serde_json::to_string(&record.properties)
                        .map(|text| text.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value, json};

    fn record(id: &str, name: &str) -> CanonicalObjectRecord {
        let mut properties = Map::new();
        properties.insert("name".into(), Value::String(name.to_string()));
        CanonicalObjectRecord {
            id: id.to_string(),
            properties,
            vector: None,
            creation_time: None,
            update_time: None,
            raw_payload: json!({ "id": id }),
        }
    }

    #[test]
    fn newer_ticket_makes_older_stale() {
        let mut store = ObjectStore::default();
        let first = store.begin_fetch();
        let second = store.begin_fetch();
        assert_eq!(store.replace(first, vec![record("a", "x")]), ApplyOutcome::Stale);
        assert!(store.page().records.is_empty());
        assert_eq!(store.replace(second, vec![record("b", "y")]), ApplyOutcome::Applied);
        assert_eq!(store.page().total, 1);
    }

    #[test]
    fn failure_keeps_last_good_page() {
        let mut store = ObjectStore::default();
        let ticket = store.begin_fetch();
        store.replace(ticket, vec![record("a", "x")]);
        let ticket = store.begin_fetch();
        assert_eq!(store.fail(ticket, "HTTP 500"), ApplyOutcome::Applied);
        assert_eq!(store.page().records[0].id, "a");
        assert_eq!(store.last_error(), Some("HTTP 500"));
        let ticket = store.begin_fetch();
        store.replace(ticket, Vec::new());
        assert_eq!(store.last_error(), None);
    }

    #[test]
    fn window_survives_replacement_and_is_clamped() {
        let mut store = ObjectStore::new(2);
        let ticket = store.begin_fetch();
        store.replace(ticket, (0..6).map(|i| record(&i.to_string(), "n")).collect());
        store.set_page_index(3);
        assert_eq!(store.page().visible_records().len(), 2);
        let ticket = store.begin_fetch();
        store.replace(ticket, (0..3).map(|i| record(&i.to_string(), "n")).collect());
        assert_eq!(store.page().page_index, 2);
        assert_eq!(store.page().page_size, 2);
    }

    #[test]
    fn clear_invalidates_in_flight_fetch() {
        let mut store = ObjectStore::default();
        let ticket = store.begin_fetch();
        store.clear();
        assert_eq!(store.replace(ticket, vec![record("a", "x")]), ApplyOutcome::Stale);
        assert!(store.page().records.is_empty());
    }

    #[test]
    fn local_search_matches_id_or_properties() {
        let mut store = ObjectStore::default();
        let ticket = store.begin_fetch();
        store.replace(ticket, vec![record("W1", "Acme"), record("w2", "Globex")]);
        assert_eq!(store.search("acme").len(), 1);
        assert_eq!(store.search("w").len(), 2);
        assert_eq!(store.search("  ").len(), 2);
        assert!(store.search("initech").is_empty());
    }
}
