use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

pub const SOURCE_ORIGIN_PARAM: &str = "__source_origin";
pub const ALLOW_SOURCE_ORIGIN: &str = "allow-source-origin";

/// Origin a replaying cache would have stamped on someone else's response.
pub const FOREIGN_ORIGIN: &str = "https://other.example";

pub const PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Mock page</title></head>
  <body><a href="/data.json">data</a><a href="/text">text</a></body>
</html>"#;

/// Size of the `/bulk.txt` body, just over ureq's default read limit.
pub const BULK_LEN: usize = 11 * 1024 * 1024;

/// Cookie set by `/login`.
pub const SESSION_COOKIE: &str = "sid=mock; Path=/";

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoRecord {
    pub method: String,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub has_cookie: bool,
    pub has_authorization: bool,
    pub source_origin: Option<String>,
    pub body: String,
}

/// Origins this server grants the allow-source-origin proof to.
#[derive(Clone, Debug)]
pub struct AppState {
    allowed_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins: Arc::new(allowed_origins),
        }
    }

    /// Echo the caller's source origin back, but only to allowed callers.
    fn proof(&self, query: &HashMap<String, String>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let Some(origin) = query.get(SOURCE_ORIGIN_PARAM) else {
            return headers;
        };
        if !self.allowed_origins.iter().any(|allowed| allowed == origin) {
            debug!(%origin, "withholding source origin proof");
            return headers;
        }
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.insert(ALLOW_SOURCE_ORIGIN, value);
        }
        headers
    }
}

pub type Params = Query<HashMap<String, String>>;

pub fn app(allowed_origins: Vec<String>) -> Router {
    Router::new()
        .route("/data.json", get(data))
        .route("/text", get(text))
        .route("/page.html", get(page))
        .route("/status/{code}", get(status))
        .route("/echo", post(echo).put(echo).delete(echo))
        .route("/signal", post(signal))
        .route("/spoofed.json", get(spoofed))
        .route("/public.json", get(public))
        .route("/bulk.txt", get(bulk))
        .route("/login", post(login))
        .with_state(AppState::new(allowed_origins))
}

pub async fn run(listener: TcpListener, allowed_origins: Vec<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(allowed_origins)).await
}

async fn data(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    (
        state.proof(&query),
        Json(serde_json::json!({ "items": [1, 2, 3] })),
    )
}

async fn text(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    (state.proof(&query), "hello from the mock origin")
}

async fn page(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    (state.proof(&query), Html(PAGE))
}

async fn status(
    State(state): State<AppState>,
    Path(code): Path<u16>,
    Query(query): Params,
) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, state.proof(&query), format!("status {code}")).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn echo(
    State(state): State<AppState>,
    method: Method,
    Query(query): Params,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let text_header = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let record = EchoRecord {
        method: method.to_string(),
        content_type: text_header(header::CONTENT_TYPE),
        accept: text_header(header::ACCEPT),
        has_cookie: headers.contains_key(header::COOKIE),
        has_authorization: headers.contains_key(header::AUTHORIZATION),
        source_origin: query.get(SOURCE_ORIGIN_PARAM).cloned(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    (state.proof(&query), Json(record))
}

async fn signal(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, state.proof(&query))
}

async fn bulk(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    (state.proof(&query), vec![b'x'; BULK_LEN])
}

async fn login(State(state): State<AppState>, Query(query): Params) -> impl IntoResponse {
    let mut headers = state.proof(&query);
    headers.insert(header::SET_COOKIE, HeaderValue::from_static(SESSION_COOKIE));
    (StatusCode::NO_CONTENT, headers)
}

async fn spoofed() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(ALLOW_SOURCE_ORIGIN, HeaderValue::from_static(FOREIGN_ORIGIN));
    (headers, Json(serde_json::json!({ "owner": FOREIGN_ORIGIN })))
}

async fn public() -> impl IntoResponse {
    Json(serde_json::json!({ "public": true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::new(vec!["https://cache.example".to_string()])
    }

    fn query(origin: &str) -> HashMap<String, String> {
        HashMap::from([(SOURCE_ORIGIN_PARAM.to_string(), origin.to_string())])
    }

    #[test]
    fn proof_is_granted_to_allowed_origin() {
        let headers = state().proof(&query("https://cache.example"));
        assert_eq!(headers[ALLOW_SOURCE_ORIGIN], "https://cache.example");
    }

    #[test]
    fn proof_is_withheld_from_unknown_origin() {
        assert!(state().proof(&query("https://evil.example")).is_empty());
    }

    #[test]
    fn proof_is_absent_without_param() {
        assert!(state().proof(&HashMap::new()).is_empty());
    }

    #[test]
    fn echo_record_roundtrips_through_json() {
        let record = EchoRecord {
            method: "POST".to_string(),
            content_type: Some("application/json".to_string()),
            accept: None,
            has_cookie: false,
            has_authorization: true,
            source_origin: None,
            body: "{}".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: EchoRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
