//! Collaborator API endpoints, envelope checking and the timed send helper.

use std::time::Duration;

use king_transport::{HttpRequest, HttpResponse, Transport, Url};
use serde_json::Value;

use crate::error::FetchError;

/// Default collaborator base URL (IPv4 loopback, not `localhost`).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5175";

/// Endpoint URLs of the collaborator API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    base: Url,
}

impl BackendEndpoints {
    /// Parse the collaborator base URL.
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidUrl`] when the URL does not parse or
    /// cannot carry a path.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base_url.trim())
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { base })
    }

    /// Base URL as configured.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// `POST /objects/query`
    #[must_use]
    pub fn objects_query(&self) -> String {
        self.join(&["objects", "query"])
    }

    /// `POST /objects/search`
    #[must_use]
    pub fn objects_search(&self) -> String {
        self.join(&["objects", "search"])
    }

    /// `POST /schema/class`
    #[must_use]
    pub fn schema_class(&self) -> String {
        self.join(&["schema", "class"])
    }

    /// `POST /schema/query`
    #[must_use]
    pub fn schema_query(&self) -> String {
        self.join(&["schema", "query"])
    }

    /// `GET /connection/list`
    #[must_use]
    pub fn connection_list(&self) -> String {
        self.join(&["connection", "list"])
    }

    /// `GET /connection/get/{id}`, id percent-encoded.
    #[must_use]
    pub fn connection_get(&self, id: &str) -> String {
        self.join(&["connection", "get", id])
    }

    /// `POST /connection/test`
    #[must_use]
    pub fn connection_test(&self) -> String {
        self.join(&["connection", "test"])
    }

    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

/// Execute through the transport, enforcing the caller-side deadline.
pub(crate) async fn send(
    transport: &dyn Transport,
    request: HttpRequest,
    timeout: Option<Duration>,
) -> Result<HttpResponse, FetchError> {
    match timeout {
        Some(deadline) => tokio::time::timeout(deadline, transport.execute(request))
            .await
            .map_err(|_| FetchError::Timeout(deadline.as_millis()))?
            .map_err(FetchError::from),
        None => transport.execute(request).await.map_err(FetchError::from),
    }
}

/// Check the `{success, message, data}` envelope and return the body.
pub(crate) fn check_envelope(response: &HttpResponse) -> Result<&Value, FetchError> {
    let status = response.status();
    let body = match response.json() {
        Ok(body) => body,
        Err(_) if !response.is_success() => {
            return Err(FetchError::BackendRejection {
                status,
                message: format!("HTTP {status}"),
            });
        }
        Err(error) => return Err(error.into()),
    };
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if response.is_success() && success {
        return Ok(body);
    }
    Err(FetchError::BackendRejection {
        status,
        message: backend_message(body).unwrap_or_else(|| format!("HTTP {status}")),
    })
}

/// Require 2xx for endpoints that answer without the envelope.
pub(crate) fn check_status(response: &HttpResponse) -> Result<&Value, FetchError> {
    let status = response.status();
    if !response.is_success() {
        let message = response
            .json()
            .ok()
            .and_then(backend_message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(FetchError::BackendRejection { status, message });
    }
    Ok(response.json()?)
}

fn backend_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, "", Vec::new(), body)
    }

    #[test]
    fn endpoints_join_under_base_path() {
        let endpoints = BackendEndpoints::new("http://127.0.0.1:5175/").expect("url");
        assert_eq!(endpoints.objects_query(), "http://127.0.0.1:5175/objects/query");
        let nested = BackendEndpoints::new("https://host/api").expect("url");
        assert_eq!(nested.objects_search(), "https://host/api/objects/search");
    }

    #[test]
    fn connection_id_is_percent_encoded() {
        let endpoints = BackendEndpoints::new(DEFAULT_BACKEND_URL).expect("url");
        assert_eq!(
            endpoints.connection_get("a b/c"),
            "http://127.0.0.1:5175/connection/get/a%20b%2Fc"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            BackendEndpoints::new("not a url"),
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            BackendEndpoints::new("mailto:ops@example.com"),
            Err(FetchError::InvalidUrl(_))
        ));
    }

    #[test]
    fn envelope_success_returns_body() {
        let resp = response(200, r#"{"success":true,"data":{"objects":[]}}"#);
        let body = check_envelope(&resp).expect("ok");
        assert_eq!(body["data"], json!({"objects": []}));
    }

    #[test]
    fn envelope_failure_carries_backend_message() {
        let resp = response(200, r#"{"success":false,"message":"unauthorized"}"#);
        assert_eq!(
            check_envelope(&resp),
            Err(FetchError::BackendRejection {
                status: 200,
                message: "unauthorized".to_string()
            })
        );
    }

    #[test]
    fn non_json_error_status_synthesizes_message() {
        let resp = response(502, "<html>bad gateway</html>");
        assert_eq!(
            check_envelope(&resp),
            Err(FetchError::BackendRejection {
                status: 502,
                message: "HTTP 502".to_string()
            })
        );
    }

    #[test]
    fn non_json_success_is_a_decode_failure() {
        let resp = response(200, "not json");
        assert!(matches!(
            check_envelope(&resp),
            Err(FetchError::Transport(_))
        ));
    }
}
