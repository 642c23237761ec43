//! king-types - Shared data model for the Weaviate-King console core.
//!
//! Everything the view layer hands to the retrieval engine (connections,
//! filters) and everything the engine hands back (canonical records, pages)
//! lives here so `king-objects` and `king-console` agree on one shape.

#![allow(clippy::doc_markdown)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Id used when the backend omits an object id.
pub const ID_SENTINEL: &str = "-";

/// Errors raised while parsing model values from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KingTypesError {
    /// Scheme other than `http` / `https`
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Filter operator other than `Equal` / `Like`
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),

    /// Filter argument not shaped like `property:Operator:value`
    #[error("invalid filter '{0}': expected property:Operator:value")]
    InvalidFilter(String),
}

/// URL scheme of a target cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP (the default)
    #[default]
    Http,
    /// TLS
    Https,
}

impl Scheme {
    /// Lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = KingTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(KingTypesError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Identifies a target cluster.
///
/// Owned by the connection-management collaborator; the core only reads it
/// and forwards its fields verbatim with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    /// Collaborator-assigned id
    pub id: String,
    /// Human-readable name
    #[serde(rename = "name")]
    pub display_name: String,
    /// URL scheme
    #[serde(default)]
    pub scheme: Scheme,
    /// `host:port` (optionally with a path), without scheme
    #[serde(rename = "address")]
    pub host_address: String,
    /// Optional API key
    #[serde(
        rename = "apiKey",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub api_key: Option<String>,
}

impl ConnectionRef {
    /// `scheme://address` without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host_address)
            .trim_end_matches('/')
            .to_string()
    }

    /// The `{id, name, scheme, address, apiKey}` block every collaborator
    /// request carries. A missing key is sent as an empty string.
    #[must_use]
    pub fn wire_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::String(self.id.clone()));
        fields.insert("name".into(), Value::String(self.display_name.clone()));
        fields.insert("scheme".into(), Value::String(self.scheme.to_string()));
        fields.insert("address".into(), Value::String(self.host_address.clone()));
        fields.insert(
            "apiKey".into(),
            Value::String(self.api_key.clone().unwrap_or_default()),
        );
        fields
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

/// Comparison used by a single filter predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    /// Exact match
    #[default]
    Equal,
    /// Wildcard match
    Like,
}

impl FromStr for FilterOperator {
    type Err = KingTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "eq" | "=" => Ok(Self::Equal),
            "like" | "~" => Ok(Self::Like),
            other => Err(KingTypesError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// How several active predicates combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterLogic {
    /// All predicates must hold
    #[default]
    And,
    /// Any predicate may hold
    Or,
}

impl FilterLogic {
    /// Lenient parse: `or` in any case is `Or`, anything else is `And`.
    #[must_use]
    pub fn normalize(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

/// One `property <operator> value` comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Property the comparison targets
    #[serde(rename = "property")]
    pub target_property: String,
    /// Comparison operator
    pub operator: FilterOperator,
    /// Literal compared against
    #[serde(rename = "value")]
    pub literal_value: String,
}

impl FilterPredicate {
    /// Build a predicate.
    pub fn new(
        target_property: impl Into<String>,
        operator: FilterOperator,
        literal_value: impl Into<String>,
    ) -> Self {
        Self {
            target_property: target_property.into(),
            operator,
            literal_value: literal_value.into(),
        }
    }

    /// Active only when both property and value are non-empty after trimming.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.target_property.trim().is_empty() && !self.literal_value.trim().is_empty()
    }
}

impl FromStr for FilterPredicate {
    type Err = KingTypesError;

    /// Parse `property:Operator:value`; the value may itself contain `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(property), Some(operator), Some(value)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(KingTypesError::InvalidFilter(s.to_string()));
        };
        Ok(Self::new(property.trim(), operator.parse()?, value))
    }
}

/// Predicates plus the logic that combines them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Predicates as entered, active or not
    pub predicates: Vec<FilterPredicate>,
    /// Combination logic
    #[serde(default)]
    pub logic: FilterLogic,
}

impl FilterSet {
    /// Build a filter set.
    #[must_use]
    pub fn new(predicates: Vec<FilterPredicate>, logic: FilterLogic) -> Self {
        Self { predicates, logic }
    }

    /// Predicates that survive the incomplete-predicate policy.
    #[must_use]
    pub fn active_predicates(&self) -> Vec<FilterPredicate> {
        self.predicates
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect()
    }

    /// True when at least one predicate is active.
    #[must_use]
    pub fn has_active(&self) -> bool {
        self.predicates.iter().any(FilterPredicate::is_active)
    }
}

/// The normalized object the UI renders, whatever shape the backend used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalObjectRecord {
    /// Backend id, or [`ID_SENTINEL`]
    pub id: String,
    /// Property values in backend order
    pub properties: Map<String, Value>,
    /// Embedding, when returned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f64>>,
    /// Creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    /// Last update timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    /// The record exactly as received
    pub raw_payload: Value,
}

impl CanonicalObjectRecord {
    /// True when the backend supplied a real id.
    #[must_use]
    pub fn has_backend_id(&self) -> bool {
        self.id != ID_SENTINEL
    }

    /// Key for list rendering; falls back to position for sentinel ids.
    #[must_use]
    pub fn list_key(&self, index: usize) -> String {
        if self.has_backend_id() {
            self.id.clone()
        } else {
            format!("object-{index}")
        }
    }

    /// Pretty JSON of the untouched payload for the detail view.
    #[must_use]
    pub fn raw_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw_payload)
            .unwrap_or_else(|_| self.raw_payload.to_string())
    }
}

/// Default number of rows shown per display page.
pub const DEFAULT_DISPLAY_PAGE_SIZE: usize = 10;

/// Records materialized by the last successful fetch plus the display window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPage {
    /// Records in backend order
    pub records: Vec<CanonicalObjectRecord>,
    /// Number of records materialized so far (not a backend total)
    pub total: usize,
    /// 1-based display page
    pub page_index: usize,
    /// Rows per display page
    pub page_size: usize,
}

impl Default for ObjectPage {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            total: 0,
            page_index: 1,
            page_size: DEFAULT_DISPLAY_PAGE_SIZE,
        }
    }
}

impl ObjectPage {
    /// Page holding `records` with the default display window.
    #[must_use]
    pub fn from_records(records: Vec<CanonicalObjectRecord>) -> Self {
        let total = records.len();
        Self {
            records,
            total,
            ..Self::default()
        }
    }

    /// Number of display pages (at least one).
    #[must_use]
    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 1;
        }
        self.total.div_ceil(self.page_size).max(1)
    }

    /// Records inside the current display window.
    #[must_use]
    pub fn visible_records(&self) -> &[CanonicalObjectRecord] {
        let size = self.page_size.max(1);
        let start = (self.page_index.max(1) - 1).saturating_mul(size);
        if start >= self.records.len() {
            return &[];
        }
        let end = (start + size).min(self.records.len());
        &self.records[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> CanonicalObjectRecord {
        CanonicalObjectRecord {
            id: id.to_string(),
            properties: Map::new(),
            vector: None,
            creation_time: None,
            update_time: None,
            raw_payload: json!({ "id": id }),
        }
    }

    #[test]
    fn predicate_requires_property_and_value() {
        assert!(FilterPredicate::new("name", FilterOperator::Equal, "acme").is_active());
        assert!(!FilterPredicate::new("name", FilterOperator::Equal, "   ").is_active());
        assert!(!FilterPredicate::new("  ", FilterOperator::Like, "acme").is_active());
    }

    #[test]
    fn filter_set_drops_incomplete_predicates() {
        let set = FilterSet::new(
            vec![
                FilterPredicate::new("name", FilterOperator::Equal, "acme"),
                FilterPredicate::new("city", FilterOperator::Like, ""),
            ],
            FilterLogic::Or,
        );
        let active = set.active_predicates();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].target_property, "name");
        assert!(set.has_active());
        assert!(!FilterSet::default().has_active());
    }

    #[test]
    fn logic_normalization_is_lenient() {
        assert_eq!(FilterLogic::normalize(" OR "), FilterLogic::Or);
        assert_eq!(FilterLogic::normalize("and"), FilterLogic::And);
        assert_eq!(FilterLogic::normalize("xor"), FilterLogic::And);
    }

    #[test]
    fn predicate_parses_from_cli_argument() {
        let p: FilterPredicate = "url:Like:http://a".parse().expect("parse");
        assert_eq!(p.target_property, "url");
        assert_eq!(p.operator, FilterOperator::Like);
        assert_eq!(p.literal_value, "http://a");
        assert!("name=acme".parse::<FilterPredicate>().is_err());
        assert!("name:Greater:1".parse::<FilterPredicate>().is_err());
    }

    #[test]
    fn connection_wire_fields_send_empty_key() {
        let conn = ConnectionRef {
            id: "c1".into(),
            display_name: "local".into(),
            scheme: Scheme::Https,
            host_address: "db.local:8080/".into(),
            api_key: None,
        };
        let fields = conn.wire_fields();
        assert_eq!(fields["scheme"], json!("https"));
        assert_eq!(fields["apiKey"], json!(""));
        assert_eq!(conn.base_url(), "https://db.local:8080");
    }

    #[test]
    fn connection_deserializes_collaborator_shape() {
        let conn: ConnectionRef = serde_json::from_value(json!({
            "id": "c1", "name": "local", "address": "127.0.0.1:8080", "apiKey": ""
        }))
        .expect("deserialize");
        assert_eq!(conn.scheme, Scheme::Http);
        assert!(conn.api_key.is_none());
    }

    #[test]
    fn list_key_falls_back_to_position() {
        assert_eq!(record("w1").list_key(3), "w1");
        assert_eq!(record(ID_SENTINEL).list_key(3), "object-3");
    }

    #[test]
    fn display_window_slices_records() {
        let mut page = ObjectPage::from_records((0..25).map(|i| record(&i.to_string())).collect());
        assert_eq!(page.page_count(), 3);
        page.page_index = 3;
        assert_eq!(page.visible_records().len(), 5);
        page.page_index = 4;
        assert!(page.visible_records().is_empty());
        assert_eq!(ObjectPage::default().page_count(), 1);
    }
}
