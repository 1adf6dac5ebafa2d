//! Public client: the full fetch pipeline behind a handful of entry points.
//!
//! # Design
//! `XhrClient` owns the immutable [`Environment`] and the collaborators chosen
//! at construction. Each call runs `normalize → tag → dispatch → verify` in
//! strict sequence and shares nothing mutable with other calls, so the client
//! is cheap to clone and safe to use from many tasks at once. Whatever fails
//! along the way is wrapped once into an [`XhrError`] and reported to the
//! [`ErrorSink`] before the caller sees it.
//!
//! There is no retry, timeout, or cancellation. Callers that need a deadline
//! wrap the returned future, e.g. in `tokio::time::timeout`.

use std::sync::Arc;

use tracing::{debug_span, warn, Instrument};

use crate::config::{ClientConfig, Environment};
use crate::dispatch::{Dispatcher, Interceptor};
use crate::error::{ConfigError, FetchError, XhrError};
use crate::fallback::UreqTransport;
use crate::http::{Response, ResponseMode};
use crate::native::ReqwestTransport;
use crate::normalize::{normalize, FetchOptions};
use crate::origin::{origin_of_str, tag, with_cors_param};
use crate::transport::Transport;
use crate::verify::verify;

/// Receives every caller-facing failure. Responsible for user-visible
/// surfacing; the client itself never prints.
pub trait ErrorSink: Send + Sync {
    fn report(&self, category: &str, message: &str, detail: &str);
}

/// Default sink: a `tracing` warning per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, category: &str, message: &str, detail: &str) {
        warn!(category, detail, "{message}");
    }
}

enum NativeChoice {
    Default,
    Custom(Arc<dyn Transport>),
    Absent,
}

/// Builder for [`XhrClient`]. Defaults: `reqwest` native transport, `ureq`
/// fallback, no interceptor, [`TracingSink`].
pub struct XhrClientBuilder {
    config: ClientConfig,
    native: NativeChoice,
    fallback: Option<Arc<dyn Transport>>,
    interceptor: Option<Arc<dyn Interceptor>>,
    sink: Arc<dyn ErrorSink>,
}

impl XhrClientBuilder {
    pub fn native(mut self, transport: Arc<dyn Transport>) -> Self {
        self.native = NativeChoice::Custom(transport);
        self
    }

    /// Build a client for an environment that has no native transport.
    pub fn without_native(mut self) -> Self {
        self.native = NativeChoice::Absent;
        self
    }

    pub fn fallback(mut self, transport: Arc<dyn Transport>) -> Self {
        self.fallback = Some(transport);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Result<XhrClient, ConfigError> {
        let env = Arc::new(Environment::from_config(&self.config)?);
        let native: Option<Arc<dyn Transport>> = match self.native {
            NativeChoice::Default => Some(Arc::new(ReqwestTransport::new()?)),
            NativeChoice::Custom(transport) => Some(transport),
            NativeChoice::Absent => None,
        };
        let fallback: Arc<dyn Transport> = match self.fallback {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new()),
        };
        let dispatcher = Dispatcher::new(env.clone(), self.interceptor, native, fallback);
        Ok(XhrClient {
            env,
            dispatcher,
            sink: self.sink,
        })
    }
}

/// Origin-verifying HTTP client for a hosted document.
#[derive(Clone)]
pub struct XhrClient {
    env: Arc<Environment>,
    dispatcher: Dispatcher,
    sink: Arc<dyn ErrorSink>,
}

impl XhrClient {
    /// Client with the default transports and sink.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: ClientConfig) -> XhrClientBuilder {
        XhrClientBuilder {
            config,
            native: NativeChoice::Default,
            fallback: None,
            interceptor: None,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Fetch expecting JSON: sends `Accept: application/json` and JSON-encodes
    /// the body.
    pub async fn fetch_json(&self, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        self.run("fetch_json", url, options.response_mode(ResponseMode::Json))
            .await
    }

    /// Fetch expecting plain text.
    pub async fn fetch_text(&self, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        self.run("fetch_text", url, options.response_mode(ResponseMode::Text))
            .await
    }

    /// Fetch and parse an HTML document. Always uses the fallback transport.
    pub async fn fetch_document(&self, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        self.run(
            "fetch_document",
            url,
            options.response_mode(ResponseMode::Document),
        )
        .await
    }

    /// Generic fetch with the options exactly as given.
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        self.run("fetch", url, options).await
    }

    /// Fire-and-confirm request, e.g. a ping or beacon. Resolves once the
    /// response has passed the same verification as any other fetch.
    pub async fn send_signal(&self, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        self.run("send_signal", url, options).await
    }

    /// `url` resolved against the location, with the origin token appended.
    pub fn cors_url(&self, url: &str) -> Result<String, XhrError> {
        let result = self
            .env
            .location()
            .join(url)
            .map_err(|e| FetchError::InvalidConfiguration(format!("invalid URL {url:?}: {e}")))
            .and_then(|resolved| with_cors_param(&self.env, &resolved));
        match result {
            Ok(tagged) => Ok(tagged.into()),
            Err(e) => Err(self.fail(origin_of_str(&self.env, url), e)),
        }
    }

    async fn run(&self, op: &'static str, url: &str, options: FetchOptions) -> Result<Response, XhrError> {
        let target_origin = origin_of_str(&self.env, url);
        let span = debug_span!("xhr", op, target_origin = %target_origin);
        self.pipeline(url, options)
            .instrument(span)
            .await
            .map_err(|e| self.fail(target_origin, e))
    }

    async fn pipeline(&self, url: &str, options: FetchOptions) -> Result<Response, FetchError> {
        let request = normalize(&self.env, url, options)?;
        let request = tag(&self.env, &request)?;
        let outcome = self.dispatcher.dispatch(&request).await;
        let response = outcome.result?;
        verify(&self.env, &request, response)
    }

    fn fail(&self, target_origin: String, error: FetchError) -> XhrError {
        let error = XhrError::wrap(target_origin, error);
        let message = format!("Failed fetching ({}/...):", error.target_origin());
        self.sink.report(error.category(), &message, error.message());
        error
    }
}
