//! Read-only collaborator calls around object retrieval: connections,
//! connection tests and schema lookups.

use std::sync::Arc;
use std::time::Duration;

use king_transport::{HttpRequest, HttpResponse, Transport};
use king_types::{ConnectionRef, ID_SENTINEL, Scheme};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::api::{self, BackendEndpoints};
use crate::error::FetchError;

/// Class row of a schema query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    /// Class name, or `-` when the backend omitted it
    pub class_name: String,
    /// Configured vectorizer module
    pub vectorizer: Option<String>,
    /// Vector index type
    pub vector_index_type: Option<String>,
    /// Number of declared properties
    pub property_count: usize,
    /// Class definition as returned
    pub raw: Value,
}

/// Successful connection test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProbe {
    /// Connection name echoed by the backend
    pub name: Option<String>,
    /// `scheme://address` echoed by the backend
    pub address: Option<String>,
    /// Readiness URL that was probed
    pub ready_url: Option<String>,
    /// Meta URL that was probed
    pub meta_url: Option<String>,
    /// Schema URL that was probed
    pub schema_url: Option<String>,
    /// Cluster meta document (version, modules)
    pub meta: Value,
}

/// Collaborator catalog client.
#[derive(Clone)]
pub struct Catalog {
    transport: Arc<dyn Transport>,
    endpoints: BackendEndpoints,
    timeout: Option<Duration>,
}

impl Catalog {
    /// Create a catalog client.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: BackendEndpoints,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            timeout,
        }
    }

    /// Saved connections. Entries that are not objects are skipped.
    ///
    /// # Errors
    /// Transport failure, timeout, or non-2xx status.
    pub async fn list_connections(&self) -> Result<Vec<ConnectionRef>, FetchError> {
        let response = self
            .send(HttpRequest::get(self.endpoints.connection_list()))
            .await?;
        let body = api::check_status(&response)?;
        let connections: Vec<ConnectionRef> = body
            .as_array()
            .map(|items| items.iter().filter_map(connection_from_value).collect())
            .unwrap_or_default();
        tracing::debug!(
            event = "objects.catalog.connections",
            count = connections.len()
        );
        Ok(connections)
    }

    /// One saved connection; fields missing from the answer fall back to
    /// `id` and defaults.
    ///
    /// # Errors
    /// Transport failure, timeout, or envelope rejection (unknown id).
    pub async fn get_connection(&self, id: &str) -> Result<ConnectionRef, FetchError> {
        let response = self
            .send(HttpRequest::get(self.endpoints.connection_get(id)))
            .await?;
        let body = api::check_envelope(&response)?;
        let mut data = body
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        data.entry("id").or_insert_with(|| Value::String(id.to_string()));
        connection_from_value(&Value::Object(data)).ok_or_else(|| FetchError::BackendRejection {
            status: response.status(),
            message: format!("connection {id} not found"),
        })
    }

    /// Probe readiness, meta and schema access of a cluster.
    ///
    /// # Errors
    /// Transport failure, timeout, or the backend's failure message.
    pub async fn test_connection(
        &self,
        connection: &ConnectionRef,
    ) -> Result<ConnectionProbe, FetchError> {
        let mut fields = connection.wire_fields();
        fields.remove("id");
        let request =
            HttpRequest::post_json(self.endpoints.connection_test(), &Value::Object(fields));
        let response = self.send(request).await?;
        let body = api::check_envelope(&response)?;
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        let probe = data.get("probe");
        let text = |value: Option<&Value>| value.and_then(Value::as_str).map(ToString::to_string);
        Ok(ConnectionProbe {
            name: text(data.get("name")),
            address: text(data.get("address")),
            ready_url: text(probe.and_then(|p| p.get("ready"))),
            meta_url: text(probe.and_then(|p| p.get("meta"))),
            schema_url: text(probe.and_then(|p| p.get("schema"))),
            meta: data.get("meta").cloned().unwrap_or(Value::Null),
        })
    }

    /// Classes of the cluster behind `connection`.
    ///
    /// # Errors
    /// Transport failure, timeout, or envelope rejection.
    pub async fn list_classes(
        &self,
        connection: &ConnectionRef,
    ) -> Result<Vec<ClassSummary>, FetchError> {
        let request = HttpRequest::post_json(
            self.endpoints.schema_query(),
            &Value::Object(connection.wire_fields()),
        );
        let response = self.send(request).await?;
        let body = api::check_envelope(&response)?;
        let classes = body
            .pointer("/data/schema/classes")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(class_summary).collect())
            .unwrap_or_default();
        Ok(classes)
    }

    /// Property names of `class_name` for the filter selector: `id` first,
    /// then declared properties, without duplicates.
    ///
    /// # Errors
    /// Transport failure, timeout, or envelope rejection.
    pub async fn class_properties(
        &self,
        connection: &ConnectionRef,
        class_name: &str,
    ) -> Result<Vec<String>, FetchError> {
        let mut fields = connection.wire_fields();
        fields.insert("className".into(), Value::String(class_name.to_string()));
        let request = HttpRequest::post_json(self.endpoints.schema_class(), &Value::Object(fields));
        let response = self.send(request).await?;
        let body = api::check_envelope(&response)?;
        let declared = body
            .pointer("/data/schema/properties")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut names = vec!["id".to_string()];
        for name in declared
            .iter()
            .filter_map(|p| p.get("name").and_then(Value::as_str))
            .filter(|name| !name.is_empty())
        {
            if !names.iter().any(|seen| seen == name) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        api::send(self.transport.as_ref(), request, self.timeout).await
    }
}

/// Build a [`ConnectionRef`] from a loosely shaped collaborator entry.
///
/// The id falls back to the name, then to `scheme://address`; an unknown
/// or missing scheme is `http`.
fn connection_from_value(value: &Value) -> Option<ConnectionRef> {
    let object: &Map<String, Value> = value.as_object()?;
    let text = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };
    let scheme: Scheme = text("scheme")
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();
    let host_address = text("address").unwrap_or_default();
    let display_name = text("name").unwrap_or_default();
    let id = text("id")
        .or_else(|| (!display_name.is_empty()).then(|| display_name.clone()))
        .unwrap_or_else(|| format!("{scheme}://{host_address}"));
    Some(ConnectionRef {
        id,
        display_name,
        scheme,
        host_address,
        api_key: text("apiKey"),
    })
}

fn class_summary(class: &Value) -> ClassSummary {
    let text = |key: &str| class.get(key).and_then(Value::as_str).map(ToString::to_string);
    ClassSummary {
        class_name: text("class").unwrap_or_else(|| ID_SENTINEL.to_string()),
        vectorizer: text("vectorizer"),
        vector_index_type: text("vectorIndexType"),
        property_count: class
            .get("properties")
            .and_then(Value::as_array)
            .map_or(0, Vec::len),
        raw: class.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_id_falls_back_to_name_then_url() {
        let named = connection_from_value(&json!({"name": "prod", "address": "h:1"}));
        assert_eq!(named.map(|c| c.id), Some("prod".to_string()));

        let bare = connection_from_value(&json!({"scheme": "https", "address": "h:1"}))
            .expect("connection");
        assert_eq!(bare.id, "https://h:1");
        assert_eq!(bare.scheme, Scheme::Https);

        assert!(connection_from_value(&json!("prod")).is_none());
    }

    #[test]
    fn unknown_scheme_defaults_to_http() {
        let conn = connection_from_value(&json!({"id": "c", "scheme": "ftp", "address": "h"}))
            .expect("connection");
        assert_eq!(conn.scheme, Scheme::Http);
        assert_eq!(conn.api_key, None);
    }

    #[test]
    fn class_summary_uses_sentinel_for_missing_name() {
        let summary = class_summary(&json!({
            "vectorizer": "none",
            "properties": [{"name": "a"}, {"name": "b"}]
        }));
        assert_eq!(summary.class_name, ID_SENTINEL);
        assert_eq!(summary.property_count, 2);
        assert_eq!(summary.vectorizer.as_deref(), Some("none"));
    }
}
