//! Native transport backed by `reqwest`.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{Credentials, Request, Response, ResponseBody, ResponseMode};
use crate::transport::{wire_payload, Transport};

const NAME: &str = "native";

/// Async transport over `reqwest`.
///
/// Holds two clients: one without a cookie store for anonymous requests and one
/// with a cookie store for credentialed requests, so cookies set by one
/// credentialed response never leak into an anonymous request.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    anonymous: reqwest::Client,
    credentialed: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let anonymous = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::new(NAME, e.to_string()))?;
        let credentialed = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| TransportError::new(NAME, e.to_string()))?;
        Ok(Self {
            anonymous,
            credentialed,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        if request.response_mode == ResponseMode::Document {
            return Err(TransportError::new(NAME, "document responses are not supported"));
        }
        let payload = wire_payload(NAME, request)?;
        let client = match request.credentials {
            Credentials::Omit => &self.anonymous,
            Credentials::SameOrigin | Credentials::Include => &self.credentialed,
        };

        let mut builder = client
            .request(request.method.into(), request.url.clone())
            .headers(payload.headers);
        if let Some(body) = payload.body {
            builder = builder.body(body);
        }
        let res = builder
            .send()
            .await
            .map_err(|e| TransportError::new(NAME, e.to_string()))?;

        let url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
        let headers = res.headers().clone();

        // Fully buffered; bodies are never streamed.
        let body = res
            .bytes()
            .await
            .map_err(|e| TransportError::new(NAME, e.to_string()))?
            .to_vec();

        Ok(Response {
            url,
            status,
            status_text,
            headers,
            body: ResponseBody::Bytes(body),
        })
    }
}
