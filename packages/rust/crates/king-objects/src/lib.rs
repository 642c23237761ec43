//! Object retrieval for the Weaviate-King console.
//!
//! Reconciles the collaborator's two query modes (cursor-paginated listing
//! and filtered search) and its three response shapes into one canonical,
//! paginated object stream.
//!
//! ```text
//! FilterSet -> QueryMode -> ObjectQuery -> Transport -> normalize_payload
//!           -> ObjectStore (generation-checked) -> CursorManager
//! ```

mod api;
mod catalog;
mod cursor;
mod engine;
mod error;
mod normalize;
mod query;
mod store;

pub use api::{BackendEndpoints, DEFAULT_BACKEND_URL};
pub use catalog::{Catalog, ClassSummary, ConnectionProbe};
pub use cursor::{CursorManager, CursorState};
pub use engine::{
    DEFAULT_REQUEST_TIMEOUT, EngineOptions, FetchOutcome, FetchReport, ObjectRetrievalEngine,
    QueryTarget,
};
pub use error::{FetchError, Resolution};
pub use normalize::{NormalizedPayload, PayloadShape, normalize_payload, normalize_record};
pub use query::{FETCH_PAGE_SIZE, ObjectQuery, QueryMode};
pub use store::{ApplyOutcome, FetchTicket, ObjectStore};
