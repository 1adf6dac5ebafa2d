//! Fallback transport backed by blocking `ureq` calls.
//!
//! Every request runs on tokio's blocking pool, so neither the round-trip nor
//! HTML parsing for document responses occupies an async worker.

use async_trait::async_trait;
use http::HeaderMap;

use crate::document::Document;
use crate::error::TransportError;
use crate::http::{Credentials, HttpMethod, Request, Response, ResponseBody, ResponseMode};
use crate::transport::{wire_payload, Transport};

const NAME: &str = "fallback";

/// Always-available transport. The only one that parses documents.
///
/// Credentialed requests share one agent and its cookie jar. Anonymous
/// requests each get a fresh agent, so no stored cookie reaches them.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    config: ureq::config::Config,
    credentialed: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status interpretation belongs to the verifier, not the transport.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        let credentialed = ureq::Agent::new_with_config(config.clone());
        Self {
            config,
            credentialed,
        }
    }

    fn agent_for(&self, credentials: Credentials) -> ureq::Agent {
        match credentials {
            Credentials::Omit => ureq::Agent::new_with_config(self.config.clone()),
            Credentials::SameOrigin | Credentials::Include => self.credentialed.clone(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(mut builder: ureq::RequestBuilder<B>, headers: &HeaderMap) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    builder
}

#[async_trait]
impl Transport for UreqTransport {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let payload = wire_payload(NAME, request)?;
        let agent = self.agent_for(request.credentials);
        let url = request.url.clone();
        let method = request.method;
        let parse_document = request.response_mode == ResponseMode::Document;

        tokio::task::spawn_blocking(move || -> Result<Response, TransportError> {
            let uri = url.as_str();
            let headers = &payload.headers;
            let result = match (method, payload.body.as_deref()) {
                (HttpMethod::Get, _) => with_headers(agent.get(uri), headers).call(),
                (HttpMethod::Delete, None) => with_headers(agent.delete(uri), headers).call(),
                (HttpMethod::Delete, Some(body)) => with_headers(agent.delete(uri), headers)
                    .force_send_body()
                    .send(body),
                (HttpMethod::Post, Some(body)) => with_headers(agent.post(uri), headers).send(body),
                (HttpMethod::Post, None) => with_headers(agent.post(uri), headers).send_empty(),
                (HttpMethod::Put, Some(body)) => with_headers(agent.put(uri), headers).send(body),
                (HttpMethod::Put, None) => with_headers(agent.put(uri), headers).send_empty(),
            };
            let response = result.map_err(|e| TransportError::new(NAME, e.to_string()))?;

            let status = response.status();
            let headers = response.headers().clone();
            // No size cap, matching the native transport.
            let bytes = response
                .into_body()
                .into_with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(|e| TransportError::new(NAME, e.to_string()))?;

            let body = if parse_document {
                ResponseBody::Document(Document::parse(&String::from_utf8_lossy(&bytes)))
            } else {
                ResponseBody::Bytes(bytes)
            };
            Ok(Response {
                url,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
                headers,
                body,
            })
        })
        .await
        .map_err(|e| TransportError::new(NAME, format!("blocking task failed: {e}")))?
    }
}
