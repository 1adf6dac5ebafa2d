//! The transport seam and helpers shared by the concrete transports.
//!
//! # Design
//! The pipeline never performs I/O itself. It hands a finished [`Request`] to
//! a [`Transport`] and gets a buffered [`Response`] back. Two implementations
//! ship with the crate:
//!
//! - [`ReqwestTransport`](crate::native::ReqwestTransport), the native async
//!   transport. A client may be built without it.
//! - [`UreqTransport`](crate::fallback::UreqTransport), the fallback. Always
//!   present, and the only one that can produce document bodies.

use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::error::TransportError;
use crate::http::{Credentials, Request, RequestBody, Response};

/// Sends a request and buffers the response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name used in logs and transport errors.
    fn name(&self) -> &'static str;

    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Headers and body bytes ready for the wire.
#[derive(Debug)]
pub(crate) struct WirePayload {
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// Flatten `request`'s body into bytes and apply the credentials policy to
/// its headers. Wrapped form data must already have been unwrapped.
pub(crate) fn wire_payload(
    transport: &'static str,
    request: &Request,
) -> Result<WirePayload, TransportError> {
    let mut headers = request.headers.clone();
    if request.credentials == Credentials::Omit {
        headers.remove(COOKIE);
        headers.remove(AUTHORIZATION);
    }

    let body = match &request.body {
        None => None,
        Some(RequestBody::Bytes(bytes)) => Some(bytes.clone()),
        Some(RequestBody::Text(text)) => {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"));
            }
            Some(text.clone().into_bytes())
        }
        Some(RequestBody::Json(value)) => Some(
            serde_json::to_vec(value).map_err(|e| TransportError::new(transport, e.to_string()))?,
        ),
        Some(RequestBody::FormData(form)) => {
            let (content_type, bytes) = form.to_multipart();
            let value = HeaderValue::from_str(&content_type)
                .map_err(|e| TransportError::new(transport, e.to_string()))?;
            headers.insert(CONTENT_TYPE, value);
            Some(bytes)
        }
        Some(RequestBody::Wrapped(_)) => {
            return Err(TransportError::new(
                transport,
                "wrapped form data reached the transport",
            ))
        }
    };

    Ok(WirePayload { headers, body })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::form::{FormData, OrderedFormData};
    use crate::http::{HttpMethod, ResponseMode};

    fn request(credentials: Credentials, body: Option<RequestBody>) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sid=1"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert("x-trace", HeaderValue::from_static("abc"));
        Request {
            url: "https://example.com/".parse().unwrap(),
            method: HttpMethod::Post,
            headers,
            body,
            credentials,
            response_mode: ResponseMode::Default,
            cors: true,
            allow_failure: false,
        }
    }

    #[test]
    fn omit_strips_credential_headers() {
        let payload = wire_payload("test", &request(Credentials::Omit, None)).unwrap();
        assert!(!payload.headers.contains_key(COOKIE));
        assert!(!payload.headers.contains_key(AUTHORIZATION));
        assert_eq!(payload.headers["x-trace"], "abc");
    }

    #[test]
    fn include_keeps_credential_headers() {
        let payload = wire_payload("test", &request(Credentials::Include, None)).unwrap();
        assert_eq!(payload.headers[COOKIE], "sid=1");
    }

    #[test]
    fn form_data_sets_multipart_content_type() {
        let mut form = FormData::new();
        form.append_text("a", "1");
        let payload = wire_payload(
            "test",
            &request(Credentials::Omit, Some(RequestBody::FormData(form))),
        )
        .unwrap();
        let content_type = payload.headers[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert!(payload.body.is_some_and(|b| !b.is_empty()));
    }

    #[test]
    fn text_body_defaults_content_type() {
        let payload = wire_payload(
            "test",
            &request(Credentials::Omit, Some(RequestBody::Text("hi".to_string()))),
        )
        .unwrap();
        assert_eq!(payload.headers[CONTENT_TYPE], "text/plain;charset=UTF-8");
        assert_eq!(payload.body.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn wrapped_body_is_refused() {
        let body = RequestBody::Wrapped(Arc::new(OrderedFormData::new()));
        let err = wire_payload("test", &request(Credentials::Omit, Some(body))).unwrap_err();
        assert_eq!(err.transport, "test");
    }
}
