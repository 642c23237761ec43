//! Response normalization: three backend payload shapes, one record shape.
//!
//! Extractors run in a fixed order and the first one that finds a non-empty
//! list wins. Shapes are never merged.

use chrono::{DateTime, Utc};
use king_types::{CanonicalObjectRecord, ID_SENTINEL};
use serde_json::{Map, Value};

/// Keys that carry extraction metadata rather than properties.
const METADATA_KEYS: [&str; 2] = ["_additional", "__typename"];

/// Payload shapes, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `data.objects`: already formatted by the collaborator
    Formatted,
    /// `data.result.objects`: REST listing result
    RestResult,
    /// `data.data.Get.<Class>` (or `data.Get.<Class>`): raw graph query
    GraphQuery,
}

type Extractor = for<'v> fn(&'v Value, &str) -> Option<&'v [Value]>;

const EXTRACTORS: [(PayloadShape, Extractor); 3] = [
    (PayloadShape::Formatted, formatted_objects),
    (PayloadShape::RestResult, rest_result_objects),
    (PayloadShape::GraphQuery, graph_query_objects),
];

/// Records plus the shape they came from (`None`: nothing matched).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPayload {
    /// Matched shape
    pub shape: Option<PayloadShape>,
    /// Canonical records in backend order
    pub records: Vec<CanonicalObjectRecord>,
    /// Items in the backend list, including ones that were not objects
    pub item_count: usize,
}

/// Normalize a decoded response body for `class_name`.
#[must_use]
pub fn normalize_payload(body: &Value, class_name: &str) -> NormalizedPayload {
    for (shape, extract) in EXTRACTORS {
        if let Some(items) = extract(body, class_name) {
            let records = items
                .iter()
                .filter_map(|item| normalize_record(item, shape))
                .collect();
            return NormalizedPayload {
                shape: Some(shape),
                records,
                item_count: items.len(),
            };
        }
    }
    NormalizedPayload {
        shape: None,
        records: Vec::new(),
        item_count: 0,
    }
}

/// Convert one backend record. Non-object items yield `None`.
#[must_use]
pub fn normalize_record(item: &Value, shape: PayloadShape) -> Option<CanonicalObjectRecord> {
    let object = item.as_object()?;
    let additional = object.get("_additional").and_then(Value::as_object);
    let meta = |key: &str| {
        additional
            .and_then(|extra| extra.get(key))
            .filter(|value| !value.is_null())
            .or_else(|| object.get(key))
    };

    let properties = match object.get("properties") {
        Some(Value::Object(properties)) => properties.clone(),
        _ if shape == PayloadShape::GraphQuery => object
            .iter()
            .filter(|(key, _)| !METADATA_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => Map::new(),
    };

    Some(CanonicalObjectRecord {
        id: meta("id")
            .and_then(id_text)
            .unwrap_or_else(|| ID_SENTINEL.to_string()),
        properties,
        vector: meta("vector").and_then(vector_values),
        creation_time: meta("creationTimeUnix").and_then(unix_millis),
        update_time: meta("lastUpdateTimeUnix").and_then(unix_millis),
        raw_payload: item.clone(),
    })
}

fn non_empty_list(value: Option<&Value>) -> Option<&[Value]> {
    value?
        .as_array()
        .filter(|items| !items.is_empty())
        .map(Vec::as_slice)
}

fn formatted_objects<'v>(body: &'v Value, _class_name: &str) -> Option<&'v [Value]> {
    non_empty_list(body.get("data")?.get("objects"))
}

fn rest_result_objects<'v>(body: &'v Value, _class_name: &str) -> Option<&'v [Value]> {
    non_empty_list(body.get("data")?.get("result")?.get("objects"))
}

fn graph_query_objects<'v>(body: &'v Value, class_name: &str) -> Option<&'v [Value]> {
    let data = body.get("data")?;
    let get = data
        .get("data")
        .and_then(|inner| inner.get("Get"))
        .or_else(|| data.get("Get"))?;
    non_empty_list(get.get(class_name))
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn vector_values(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}

/// Millisecond epoch as number or numeric string.
#[allow(clippy::cast_possible_truncation)]
fn unix_millis(value: &Value) -> Option<DateTime<Utc>> {
    let millis = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp_millis(millis)
}
