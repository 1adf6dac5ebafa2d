//! Origin-verifying fetch client for documents hosted by a third party.
//!
//! # Overview
//! A page served through a cache or embedding host still needs to fetch from
//! its own origin and from CORS-enabled origins. This crate turns a logical
//! `(url, options)` call into a response that is known to have been produced
//! for the calling origin:
//!
//! 1. [`normalize`] builds a canonical [`Request`] from partial options.
//! 2. [`origin`] tags cross-origin URLs with the caller's [`OriginToken`].
//! 3. [`dispatch`] lets an [`Interceptor`] answer, or picks the native or
//!    fallback [`Transport`].
//! 4. [`verify`] checks the echoed origin proof and the status.
//!
//! # Design
//! - The pipeline does no I/O of its own. Transports and the interceptor are
//!   injected trait objects, so tests drive it with in-memory fakes.
//! - Everything shared between calls lives in an immutable [`Environment`].
//! - Callers see a single error type, [`XhrError`].

pub mod client;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod fallback;
pub mod form;
pub mod http;
pub mod native;
pub mod normalize;
pub mod origin;
pub mod transport;
pub mod verify;

pub use client::{ErrorSink, TracingSink, XhrClient, XhrClientBuilder};
pub use config::{ClientConfig, Environment, OriginToken};
pub use dispatch::{DispatchKind, DispatchOutcome, Dispatcher, Interceptor};
pub use document::{Document, Element, Node};
pub use error::{ConfigError, FetchError, TransportError, XhrError, XHR_ERROR_CATEGORY};
pub use fallback::UreqTransport;
pub use form::{FormData, FormDataWrapper, FormValue, OrderedFormData};
pub use self::http::{Credentials, HttpMethod, Request, RequestBody, Response, ResponseBody, ResponseMode};
pub use native::ReqwestTransport;
pub use normalize::FetchOptions;
pub use transport::Transport;
