//! Object retrieval engine: selector, transport, normalizer, cursor and store
//! wired into one fetch operation.
//!
//! The state lock is never held across a transport call. Each fetch takes a
//! generation ticket before it releases the lock and re-checks it when the
//! response comes back, so a response overtaken by a newer fetch (or by a
//! filter or target change) is dropped without touching the store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use king_transport::Transport;
use king_types::{
    CanonicalObjectRecord, ConnectionRef, DEFAULT_DISPLAY_PAGE_SIZE, FilterSet, ObjectPage,
};
use tokio::sync::Mutex;

use crate::api::{self, BackendEndpoints};
use crate::cursor::{CursorManager, CursorState};
use crate::error::FetchError;
use crate::normalize::{NormalizedPayload, PayloadShape, normalize_payload};
use crate::query::{FETCH_PAGE_SIZE, ObjectQuery, QueryMode};
use crate::store::{ApplyOutcome, ObjectStore};

/// Default caller-side deadline per collaborator call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Engine tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Records requested per fetch
    pub fetch_page_size: usize,
    /// Rows per display page
    pub display_page_size: usize,
    /// Deadline per transport call; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fetch_page_size: FETCH_PAGE_SIZE,
            display_page_size: DEFAULT_DISPLAY_PAGE_SIZE,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

/// Connection and class a fetch runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    /// Cluster connection fields, passed through opaquely
    pub connection: ConnectionRef,
    /// Class whose objects are listed
    pub class_name: String,
}

impl QueryTarget {
    /// Build a target.
    pub fn new(connection: ConnectionRef, class_name: impl Into<String>) -> Self {
        Self {
            connection,
            class_name: class_name.into(),
        }
    }
}

/// What an applied fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReport {
    /// Store page after the fetch
    pub page: ObjectPage,
    /// Fetch ran in search mode
    pub search_mode: bool,
    /// Search results are one page with no continuation
    pub capped: bool,
    /// Payload shape that matched (`None`: nothing matched, empty page)
    pub shape: Option<PayloadShape>,
    /// Listing cursor is positioned, so another fetch continues the stream
    pub has_more: bool,
}

/// Result of [`ObjectRetrievalEngine::fetch`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Response applied to the store
    Applied(FetchReport),
    /// A newer fetch or state change superseded this one; nothing applied
    Stale,
}

#[derive(Debug)]
struct EngineState {
    target: Option<QueryTarget>,
    filters: FilterSet,
    cursor: CursorManager,
    store: ObjectStore,
}

/// Canonical, paginated object stream over the collaborator API.
pub struct ObjectRetrievalEngine {
    transport: Arc<dyn Transport>,
    endpoints: BackendEndpoints,
    options: EngineOptions,
    state: Mutex<EngineState>,
}

impl ObjectRetrievalEngine {
    /// Create an engine with no target selected.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: BackendEndpoints,
        options: EngineOptions,
    ) -> Self {
        let options = EngineOptions {
            fetch_page_size: options.fetch_page_size.max(1),
            ..options
        };
        Self {
            transport,
            endpoints,
            state: Mutex::new(EngineState {
                target: None,
                filters: FilterSet::default(),
                cursor: CursorManager::new(),
                store: ObjectStore::new(options.display_page_size),
            }),
            options,
        }
    }

    /// Effective options.
    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Point the engine at a connection and class.
    ///
    /// A different target clears the page, the filters and the cursor and
    /// makes any in-flight fetch stale. Re-selecting the same target is a
    /// no-op.
    pub async fn select_target(&self, target: QueryTarget) {
        let mut state = self.state.lock().await;
        if state.target.as_ref() == Some(&target) {
            return;
        }
        tracing::debug!(
            event = "objects.target.changed",
            class_name = %target.class_name,
            connection_id = %target.connection.id,
        );
        state.store.clear();
        state.cursor.reset();
        state.filters = FilterSet::default();
        state.target = Some(target);
    }

    /// Currently selected target.
    pub async fn target(&self) -> Option<QueryTarget> {
        self.state.lock().await.target.clone()
    }

    /// Replace the filter set. Resets the cursor and makes in-flight
    /// fetches stale; the current page stays until the next fetch.
    pub async fn set_filters(&self, filters: FilterSet) {
        let mut state = self.state.lock().await;
        if state.filters == filters {
            return;
        }
        state.filters = filters;
        state.cursor.reset();
        state.store.invalidate();
    }

    /// Current filter set.
    pub async fn filters(&self) -> FilterSet {
        self.state.lock().await.filters.clone()
    }

    /// Fetch the next page for the current target and filters.
    ///
    /// Listing mode continues from the stored cursor; search mode always
    /// starts over and leaves the cursor at start.
    ///
    /// # Errors
    /// [`FetchError::NoTarget`] without a target, otherwise the transport,
    /// envelope or timeout failure. On error the store keeps its last good
    /// page. A failure that arrives after a newer fetch was issued is
    /// reported as [`FetchOutcome::Stale`] instead.
    pub async fn fetch(&self) -> Result<FetchOutcome, FetchError> {
        let (ticket, target, query) = {
            let mut state = self.state.lock().await;
            let Some(target) = state.target.clone() else {
                return Err(FetchError::NoTarget);
            };
            let mode = QueryMode::select(&state.filters, state.cursor.after());
            if mode.is_search() {
                state.cursor.reset();
            }
            let query = ObjectQuery::new(&target.class_name, self.options.fetch_page_size, mode);
            (state.store.begin_fetch(), target, query)
        };

        let started = Instant::now();
        tracing::debug!(
            event = "objects.fetch.started",
            class_name = %query.class_name,
            search_mode = query.mode.is_search(),
            generation = ticket.generation(),
        );
        let result = self.execute(&target, &query).await;
        let elapsed_ms = started.elapsed().as_millis();

        let mut state = self.state.lock().await;
        if !state.store.is_current(ticket) {
            tracing::debug!(
                event = "objects.fetch.stale",
                generation = ticket.generation(),
                current = state.store.generation(),
                elapsed_ms,
            );
            return Ok(FetchOutcome::Stale);
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(
                    event = "objects.fetch.failed",
                    class_name = %query.class_name,
                    code = error.code(),
                    error = %error,
                    elapsed_ms,
                );
                state.store.fail(ticket, error.to_string());
                return Err(error);
            }
        };
        if payload.shape.is_none() {
            tracing::warn!(
                event = "objects.fetch.unrecognized_payload",
                class_name = %query.class_name,
            );
        }

        let search_mode = query.mode.is_search();
        if !search_mode {
            state
                .cursor
                .observe_listing_page(&payload.records, payload.item_count, query.limit);
        }
        let record_count = payload.records.len();
        if state.store.replace(ticket, payload.records) == ApplyOutcome::Stale {
            return Ok(FetchOutcome::Stale);
        }
        let has_more = matches!(state.cursor.state(), CursorState::Positioned(_));
        tracing::info!(
            event = "objects.fetch.applied",
            class_name = %query.class_name,
            search_mode,
            record_count,
            has_more,
            elapsed_ms,
        );
        Ok(FetchOutcome::Applied(FetchReport {
            page: state.store.page().clone(),
            search_mode,
            capped: search_mode,
            shape: payload.shape,
            has_more,
        }))
    }

    /// Start over: cursor back to start, display window to page 1, fetch.
    ///
    /// # Errors
    /// Same as [`Self::fetch`].
    pub async fn refresh(&self) -> Result<FetchOutcome, FetchError> {
        {
            let mut state = self.state.lock().await;
            state.cursor.reset();
            state.store.reset_window();
        }
        self.fetch().await
    }

    /// Snapshot of the current page.
    pub async fn page(&self) -> ObjectPage {
        self.state.lock().await.store.page().clone()
    }

    /// Message of the last failed fetch, if the last fetch failed.
    pub async fn last_error(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .store
            .last_error()
            .map(ToString::to_string)
    }

    /// Current cursor state.
    pub async fn cursor(&self) -> CursorState {
        self.state.lock().await.cursor.state().clone()
    }

    /// Move the display window (1-based, clamped).
    pub async fn set_display_page(&self, page_index: usize) {
        self.state.lock().await.store.set_page_index(page_index);
    }

    /// Change rows per display page; returns to page 1.
    pub async fn set_display_page_size(&self, page_size: usize) {
        self.state.lock().await.store.set_page_size(page_size);
    }

    /// Case-insensitive search over the materialized records.
    pub async fn search_local(&self, query: &str) -> Vec<CanonicalObjectRecord> {
        self.state
            .lock()
            .await
            .store
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    async fn execute(
        &self,
        target: &QueryTarget,
        query: &ObjectQuery,
    ) -> Result<NormalizedPayload, FetchError> {
        let request = query.to_request(&target.connection, &self.endpoints);
        let response =
            api::send(self.transport.as_ref(), request, self.options.request_timeout).await?;
        let body = api::check_envelope(&response)?;
        Ok(normalize_payload(body, &query.class_name))
    }
}
