//! Request/response values shared by every transport variant.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde_json::Value;

use crate::error::TransportError;

/// HTTP methods the console issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
    /// PATCH
    Patch,
}

impl HttpMethod {
    /// Uppercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            other => Err(TransportError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// One outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL
    pub url: String,
    /// Method
    pub method: HttpMethod,
    /// Header name → value
    pub headers: BTreeMap<String, String>,
    /// Optional text body
    pub body: Option<String>,
}

impl HttpRequest {
    /// GET without body.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// POST with a JSON body and `Content-Type: application/json`.
    pub fn post_json(url: impl Into<String>, body: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            url: url.into(),
            method: HttpMethod::Post,
            headers,
            body: Some(body.to_string()),
        }
    }

    /// Body parsed as JSON, if any. Used by fakes and tests.
    #[must_use]
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// Uniform response returned by every transport.
///
/// JSON decoding is lazy: the first call to [`HttpResponse::json`] parses
/// `body_text` and caches the outcome, later calls return the cached value.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: u16,
    status_text: String,
    headers: BTreeMap<String, String>,
    body_text: String,
    json: OnceLock<Result<Value, String>>,
}

impl HttpResponse {
    /// Build a response. Header names are stored lowercase.
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: impl IntoIterator<Item = (String, String)>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            body_text: body_text.into(),
            json: OnceLock::new(),
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase (may be empty).
    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// True for 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// All headers, lowercase names.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw body.
    #[must_use]
    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    /// Body decoded as JSON, parsed at most once.
    ///
    /// # Errors
    /// Returns [`TransportError::Decode`] when the body is not valid JSON;
    /// the failure is cached as well.
    pub fn json(&self) -> Result<&Value, TransportError> {
        self.json
            .get_or_init(|| serde_json::from_str(&self.body_text).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|message| TransportError::Decode(message.clone()))
    }
}
