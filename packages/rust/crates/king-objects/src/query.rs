//! Query mode selection: listing (cursor-paginated) vs search (filtered).
//!
//! Any active predicate switches the whole fetch to search mode, which is a
//! single capped page with no cursor. Only listing mode can continue.

use king_transport::HttpRequest;
use king_types::{ConnectionRef, FilterLogic, FilterPredicate, FilterSet};
use serde_json::{Value, json};

use crate::api::BackendEndpoints;

/// Records requested per fetch, in both modes.
pub const FETCH_PAGE_SIZE: usize = 100;

/// Which backend operation a fetch uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMode {
    /// Unconditional listing continuing after `after` (or from the start)
    Listing {
        /// Continuation cursor
        after: Option<String>,
    },
    /// Predicate search; never carries a cursor
    Search {
        /// Active predicates only
        filters: Vec<FilterPredicate>,
        /// How they combine
        logic: FilterLogic,
    },
}

impl QueryMode {
    /// Pick the mode for `filters`; `cursor` is only used for listing.
    #[must_use]
    pub fn select(filters: &FilterSet, cursor: Option<&str>) -> Self {
        let active = filters.active_predicates();
        if active.is_empty() {
            Self::Listing {
                after: cursor.map(ToString::to_string),
            }
        } else {
            Self::Search {
                filters: active,
                logic: filters.logic,
            }
        }
    }

    /// True for search mode.
    #[must_use]
    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search { .. })
    }
}

/// One object fetch against a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectQuery {
    /// Target class
    pub class_name: String,
    /// Page size requested from the backend
    pub limit: usize,
    /// Listing or search
    pub mode: QueryMode,
}

impl ObjectQuery {
    /// Build a query.
    pub fn new(class_name: impl Into<String>, limit: usize, mode: QueryMode) -> Self {
        Self {
            class_name: class_name.into(),
            limit,
            mode,
        }
    }

    /// Collaborator endpoint for this mode.
    #[must_use]
    pub fn endpoint(&self, endpoints: &BackendEndpoints) -> String {
        match self.mode {
            QueryMode::Listing { .. } => endpoints.objects_query(),
            QueryMode::Search { .. } => endpoints.objects_search(),
        }
    }

    /// JSON body: connection fields, class, limit, then mode fields.
    #[must_use]
    pub fn body(&self, connection: &ConnectionRef) -> Value {
        let mut body = connection.wire_fields();
        body.insert("className".into(), Value::String(self.class_name.clone()));
        body.insert("limit".into(), json!(self.limit));
        match &self.mode {
            QueryMode::Listing { after } => {
                body.insert("after".into(), json!(after));
            }
            QueryMode::Search { filters, logic } => {
                body.insert("filters".into(), json!(filters));
                body.insert("logic".into(), json!(logic));
            }
        }
        Value::Object(body)
    }

    /// Ready-to-send request.
    #[must_use]
    pub fn to_request(
        &self,
        connection: &ConnectionRef,
        endpoints: &BackendEndpoints,
    ) -> HttpRequest {
        HttpRequest::post_json(self.endpoint(endpoints), &self.body(connection))
    }
}
