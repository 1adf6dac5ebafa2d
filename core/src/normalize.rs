//! Request normalizer: caller options in, canonical [`Request`] out.
//!
//! Pure. Applies method, header, body and credential defaults, and rejects
//! contradictory option sets before anything is dispatched.

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::Environment;
use crate::error::FetchError;
use crate::http::{Credentials, HttpMethod, Request, RequestBody, ResponseMode};

/// Partial request configuration supplied by callers.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub credentials: Option<Credentials>,
    pub response_mode: ResponseMode,
    /// Origin tagging and verification. Disable only for resources that must
    /// be cacheable across pages.
    pub cors: bool,
    pub allow_failure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: None,
            headers: Vec::new(),
            body: None,
            credentials: None,
            response_mode: ResponseMode::Default,
            cors: true,
            allow_failure: false,
        }
    }
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json_body(self, value: serde_json::Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }

    pub fn cors(mut self, cors: bool) -> Self {
        self.cors = cors;
        self
    }

    pub fn allow_failure(mut self, allow_failure: bool) -> Self {
        self.allow_failure = allow_failure;
        self
    }
}

/// Build a canonical request for `url` (resolved against the environment
/// location) from `options`.
pub fn normalize(env: &Environment, url: &str, options: FetchOptions) -> Result<Request, FetchError> {
    let url = env
        .location()
        .join(url)
        .map_err(|e| FetchError::invalid(format!("invalid URL {url:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::invalid(format!(
            "unsupported URL scheme {:?}",
            url.scheme()
        )));
    }

    let method = options.method.unwrap_or_default();
    let mode = options.response_mode;
    if mode == ResponseMode::Document && (method.is_body_bearing() || options.body.is_some()) {
        return Err(FetchError::invalid(format!(
            "document responses cannot be combined with a {} request body",
            method.as_str()
        )));
    }
    if method == HttpMethod::Get && options.body.is_some() {
        return Err(FetchError::invalid("GET request cannot have a body"));
    }

    let mut headers = HeaderMap::new();
    for (name, value) in &options.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::invalid(format!("invalid header name {name:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| FetchError::invalid(format!("invalid value for header {name}")))?;
        headers.append(name, value);
    }

    match mode {
        ResponseMode::Json => {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        ResponseMode::Text => {
            headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        }
        ResponseMode::Default | ResponseMode::Document => {}
    }

    let body = match options.body {
        Some(RequestBody::Json(value)) => {
            let bytes = serde_json::to_vec(&value)
                .map_err(|e| FetchError::invalid(format!("body is not serializable: {e}")))?;
            set_json_content_type(&mut headers);
            Some(RequestBody::Bytes(bytes))
        }
        Some(RequestBody::Text(text)) if mode == ResponseMode::Json => {
            let bytes = serde_json::to_vec(&text)
                .map_err(|e| FetchError::invalid(format!("body is not serializable: {e}")))?;
            set_json_content_type(&mut headers);
            Some(RequestBody::Bytes(bytes))
        }
        // Raw bytes are taken as already encoded.
        Some(body) if mode == ResponseMode::Json && !body.is_form_data() => {
            set_json_content_type(&mut headers);
            Some(body)
        }
        other => other,
    };

    // Resolved here so transports only ever see Include or Omit.
    let credentials = match options.credentials {
        Some(Credentials::Include) => Credentials::Include,
        Some(Credentials::Omit) => Credentials::Omit,
        Some(Credentials::SameOrigin) | None if env.is_same_origin(&url) => Credentials::Include,
        Some(Credentials::SameOrigin) | None => Credentials::Omit,
    };

    Ok(Request {
        url,
        method,
        headers,
        body,
        credentials,
        response_mode: mode,
        cors: options.cors,
        allow_failure: options.allow_failure,
    })
}

fn set_json_content_type(headers: &mut HeaderMap) {
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
}
