//! Request and response values passed through the fetch pipeline.
//!
//! # Design
//! A `Request` is built once by the normalizer and only ever replaced, never
//! mutated, by later stages. Transports receive it by reference and hand back
//! a fully buffered `Response`. Header maps are `http::HeaderMap`, so lookups
//! are case-insensitive and insertion order is kept for iteration.

use std::sync::Arc;

use http::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::document::Document;
use crate::form::{FormData, FormDataWrapper};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Methods whose purpose is to upload a body.
    pub fn is_body_bearing(self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Whether cookies and authorization travel with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    Omit,
    SameOrigin,
    Include,
}

/// How the caller intends to consume the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    #[default]
    Default,
    Text,
    Json,
    /// Parse the body into a [`Document`]. Only the fallback transport can.
    Document,
}

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Serialized to bytes by the normalizer.
    Json(serde_json::Value),
    Text(String),
    Bytes(Vec<u8>),
    FormData(FormData),
    /// Form data behind a wrapper; unwrapped before any transport sees it.
    Wrapped(Arc<dyn FormDataWrapper>),
}

impl RequestBody {
    pub fn is_wrapped(&self) -> bool {
        matches!(self, RequestBody::Wrapped(_))
    }

    pub fn is_form_data(&self) -> bool {
        matches!(self, RequestBody::FormData(_) | RequestBody::Wrapped(_))
    }
}

/// A normalized request. `url` is always absolute.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub credentials: Credentials,
    pub response_mode: ResponseMode,
    /// Origin tagging and verification are active.
    pub cors: bool,
    /// Non-2xx statuses resolve instead of rejecting.
    pub allow_failure: bool,
}

/// Buffered response body.
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Bytes(Vec<u8>),
    Document(Document),
}

/// A fully buffered HTTP response, from a transport or an interceptor.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL of the response (after redirects, if the transport follows them).
    pub url: Url,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl Response {
    /// Build a byte-bodied response. Handy for interceptors and tests.
    pub fn new(url: Url, status: u16, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        let status_text = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown")
            .to_string();
        Self {
            url,
            status,
            status_text,
            headers,
            body: ResponseBody::Bytes(body.into()),
        }
    }

    /// True for statuses in `200..300`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw body bytes. Empty for document bodies.
    pub fn bytes(&self) -> &[u8] {
        match &self.body {
            ResponseBody::Bytes(bytes) => bytes,
            ResponseBody::Document(_) => &[],
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.bytes()).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.bytes())
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.body {
            ResponseBody::Document(doc) => Some(doc),
            ResponseBody::Bytes(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> Response {
        Response::new(
            "https://example.com/".parse().unwrap(),
            status,
            HeaderMap::new(),
            body,
        )
    }

    #[test]
    fn ok_covers_exactly_the_2xx_range() {
        assert!(!response(199, "").ok());
        assert!(response(200, "").ok());
        assert!(response(299, "").ok());
        assert!(!response(300, "").ok());
        assert!(!response(404, "").ok());
    }

    #[test]
    fn status_text_uses_canonical_reason() {
        assert_eq!(response(404, "").status_text, "Not Found");
        assert_eq!(response(599, "").status_text, "Unknown");
    }

    #[test]
    fn json_body_parses() {
        let value: serde_json::Value = response(200, r#"{"a":1}"#).json().unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Allow-Source-Origin", "https://a.example".parse().unwrap());
        let resp = Response::new("https://example.com/".parse().unwrap(), 200, headers, "");
        assert_eq!(resp.header("allow-source-origin"), Some("https://a.example"));
    }

    #[test]
    fn body_bearing_methods() {
        assert!(HttpMethod::Post.is_body_bearing());
        assert!(HttpMethod::Put.is_body_bearing());
        assert!(!HttpMethod::Get.is_body_bearing());
        assert!(!HttpMethod::Delete.is_body_bearing());
    }
}
