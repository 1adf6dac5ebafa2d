//! Dispatch selector: interception first, then native or fallback transport.
//!
//! # Design
//! The decision is made per request from two inputs only: what the request
//! needs (`ResponseMode::Document` needs the fallback) and what the
//! environment offers (a native transport may be absent, and interception is
//! only possible in a single-document host). Failures from the interceptor or
//! the chosen transport are passed through unchanged inside the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Environment;
use crate::error::TransportError;
use crate::http::{Request, RequestBody, Response, ResponseMode};
use crate::transport::Transport;

/// Same-process collaborator that may answer a request without a transport.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// `Ok(None)` means "not mine, send it normally".
    async fn try_intercept(
        &self,
        env: &Environment,
        request: &Request,
    ) -> Result<Option<Response>, TransportError>;
}

/// Which path produced a dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Intercepted,
    Native,
    Fallback,
}

/// Result of dispatching one request, before verification.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub kind: DispatchKind,
    pub result: Result<Response, TransportError>,
}

/// Routes requests to an interceptor or a transport.
#[derive(Clone)]
pub struct Dispatcher {
    env: Arc<Environment>,
    interceptor: Option<Arc<dyn Interceptor>>,
    native: Option<Arc<dyn Transport>>,
    fallback: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        env: Arc<Environment>,
        interceptor: Option<Arc<dyn Interceptor>>,
        native: Option<Arc<dyn Transport>>,
        fallback: Arc<dyn Transport>,
    ) -> Self {
        Self {
            env,
            interceptor,
            native,
            fallback,
        }
    }

    /// Transport that would carry `request` if nothing intercepts it.
    pub fn select_transport(&self, request: &Request) -> (DispatchKind, &Arc<dyn Transport>) {
        match (&self.native, request.response_mode) {
            // Document parsing is kept off the native path.
            (_, ResponseMode::Document) | (None, _) => (DispatchKind::Fallback, &self.fallback),
            (Some(native), _) => (DispatchKind::Native, native),
        }
    }

    pub async fn dispatch(&self, request: &Request) -> DispatchOutcome {
        if let Some(interceptor) = self.interceptor.as_ref().filter(|_| self.env.is_single_document()) {
            match interceptor.try_intercept(&self.env, request).await {
                Ok(None) => {}
                Ok(Some(response)) => {
                    debug!(status = response.status, "request intercepted");
                    return DispatchOutcome {
                        kind: DispatchKind::Intercepted,
                        result: Ok(response),
                    };
                }
                Err(e) => {
                    return DispatchOutcome {
                        kind: DispatchKind::Intercepted,
                        result: Err(e),
                    }
                }
            }
        }

        let unwrapped;
        let request = match &request.body {
            Some(RequestBody::Wrapped(wrapper)) => {
                let mut native_body = request.clone();
                native_body.body = Some(RequestBody::FormData(wrapper.to_form_data()));
                unwrapped = native_body;
                &unwrapped
            }
            _ => request,
        };

        let (kind, transport) = self.select_transport(request);
        debug!(transport = transport.name(), "dispatching request");
        DispatchOutcome {
            kind,
            result: transport.send(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::config::ClientConfig;
    use crate::form::{FormData, OrderedFormData};
    use crate::http::{Credentials, HttpMethod};

    struct Recording {
        name: &'static str,
        calls: AtomicUsize,
        bodies: Mutex<Vec<Option<RequestBody>>>,
    }

    impl Recording {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, request: &Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.lock().unwrap().push(request.body.clone());
            Ok(Response::new(request.url.clone(), 200, http::HeaderMap::new(), self.name))
        }
    }

    struct Fixed(Option<u16>);

    #[async_trait]
    impl Interceptor for Fixed {
        async fn try_intercept(
            &self,
            _env: &Environment,
            request: &Request,
        ) -> Result<Option<Response>, TransportError> {
            Ok(self
                .0
                .map(|status| Response::new(request.url.clone(), status, http::HeaderMap::new(), "")))
        }
    }

    fn env(single_document: bool) -> Arc<Environment> {
        Arc::new(
            Environment::from_config(
                &ClientConfig::new("https://cache.example/").single_document(single_document),
            )
            .unwrap(),
        )
    }

    fn request(mode: ResponseMode, body: Option<RequestBody>) -> Request {
        Request {
            url: "https://example.com/".parse().unwrap(),
            method: if body.is_some() { HttpMethod::Post } else { HttpMethod::Get },
            headers: http::HeaderMap::new(),
            body,
            credentials: Credentials::Omit,
            response_mode: mode,
            cors: true,
            allow_failure: false,
        }
    }

    #[tokio::test]
    async fn native_is_preferred_when_present() {
        let native = Recording::new("native");
        let fallback = Recording::new("fallback");
        let dispatcher = Dispatcher::new(env(true), None, Some(native.clone()), fallback.clone());
        let outcome = dispatcher.dispatch(&request(ResponseMode::Json, None)).await;
        assert_eq!(outcome.kind, DispatchKind::Native);
        assert_eq!((native.calls(), fallback.calls()), (1, 0));
    }

    #[tokio::test]
    async fn document_mode_always_uses_fallback() {
        let native = Recording::new("native");
        let fallback = Recording::new("fallback");
        let dispatcher = Dispatcher::new(env(true), None, Some(native.clone()), fallback.clone());
        let outcome = dispatcher.dispatch(&request(ResponseMode::Document, None)).await;
        assert_eq!(outcome.kind, DispatchKind::Fallback);
        assert_eq!((native.calls(), fallback.calls()), (0, 1));
    }

    #[tokio::test]
    async fn missing_native_falls_back() {
        let fallback = Recording::new("fallback");
        let dispatcher = Dispatcher::new(env(true), None, None, fallback.clone());
        let outcome = dispatcher.dispatch(&request(ResponseMode::Text, None)).await;
        assert_eq!(outcome.kind, DispatchKind::Fallback);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn interceptor_short_circuits_transports() {
        let native = Recording::new("native");
        let fallback = Recording::new("fallback");
        let dispatcher = Dispatcher::new(
            env(true),
            Some(Arc::new(Fixed(Some(203)))),
            Some(native.clone()),
            fallback.clone(),
        );
        let outcome = dispatcher.dispatch(&request(ResponseMode::Default, None)).await;
        assert_eq!(outcome.kind, DispatchKind::Intercepted);
        assert_eq!(outcome.result.unwrap().status, 203);
        assert_eq!((native.calls(), fallback.calls()), (0, 0));
    }

    #[tokio::test]
    async fn interceptor_is_skipped_outside_single_document() {
        let native = Recording::new("native");
        let dispatcher = Dispatcher::new(
            env(false),
            Some(Arc::new(Fixed(Some(203)))),
            Some(native.clone()),
            Recording::new("fallback"),
        );
        let outcome = dispatcher.dispatch(&request(ResponseMode::Default, None)).await;
        assert_eq!(outcome.kind, DispatchKind::Native);
        assert_eq!(native.calls(), 1);
    }

    #[tokio::test]
    async fn declined_interception_unwraps_form_data() {
        let native = Recording::new("native");
        let dispatcher = Dispatcher::new(
            env(true),
            Some(Arc::new(Fixed(None))),
            Some(native.clone()),
            Recording::new("fallback"),
        );
        let mut wrapped = OrderedFormData::new();
        wrapped.append("a", "1");
        let req = request(ResponseMode::Default, Some(RequestBody::Wrapped(Arc::new(wrapped))));
        let outcome = dispatcher.dispatch(&req).await;
        assert_eq!(outcome.kind, DispatchKind::Native);

        let bodies = native.bodies.lock().unwrap();
        let mut expected = FormData::new();
        expected.append_text("a", "1");
        assert!(matches!(&bodies[0], Some(RequestBody::FormData(form)) if *form == expected));
        // The caller's request still holds the wrapper.
        assert!(req.body.as_ref().is_some_and(RequestBody::is_wrapped));
    }
}
