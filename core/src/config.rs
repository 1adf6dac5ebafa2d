//! Client configuration and the per-client environment derived from it.
//!
//! # Design
//! `ClientConfig` is plain serde data so hosts can ship it as JSON or build it
//! from environment variables. It is validated exactly once, by
//! [`Environment::from_config`]. The resulting `Environment` is immutable for
//! the life of the client: the caller location, its [`OriginToken`], and
//! whether the host is a single addressable document (which gates
//! interception).

use std::fmt;

use serde::Deserialize;
use url::{Origin, Url};

use crate::error::ConfigError;

pub const DEFAULT_SOURCE_ORIGIN_PARAM: &str = "__source_origin";
pub const DEFAULT_ALLOW_SOURCE_ORIGIN_HEADER: &str = "allow-source-origin";

/// Host-supplied configuration, read once at client construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// URL of the document issuing requests.
    pub location: String,
    #[serde(default = "default_true")]
    pub single_document: bool,
    #[serde(default = "default_param")]
    pub source_origin_param: String,
    #[serde(default = "default_header")]
    pub allow_source_origin_header: String,
}

fn default_true() -> bool {
    true
}

fn default_param() -> String {
    DEFAULT_SOURCE_ORIGIN_PARAM.to_string()
}

fn default_header() -> String {
    DEFAULT_ALLOW_SOURCE_ORIGIN_HEADER.to_string()
}

impl ClientConfig {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            single_document: true,
            source_origin_param: default_param(),
            allow_source_origin_header: default_header(),
        }
    }

    pub fn single_document(mut self, single_document: bool) -> Self {
        self.single_document = single_document;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// Read `XHR_LOCATION` (required) and `XHR_SINGLE_DOCUMENT` (optional,
    /// `true`/`false`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let location = lookup("XHR_LOCATION").ok_or(ConfigError::MissingVar("XHR_LOCATION"))?;
        let mut config = Self::new(location);
        if let Some(raw) = lookup("XHR_SINGLE_DOCUMENT") {
            config.single_document = raw.parse().map_err(|_| {
                ConfigError::Malformed(format!("XHR_SINGLE_DOCUMENT must be true or false, got {raw:?}"))
            })?;
        }
        Ok(config)
    }
}

/// Opaque token identifying the calling origin: the ASCII serialization of
/// the location's scheme, host, and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OriginToken(String);

impl OriginToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable per-client view of the hosting environment.
#[derive(Debug, Clone)]
pub struct Environment {
    location: Url,
    origin: Origin,
    token: OriginToken,
    single_document: bool,
    source_origin_param: String,
    allow_source_origin_header: String,
}

impl Environment {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidLocation {
            location: config.location.clone(),
            reason,
        };
        let location = Url::parse(&config.location).map_err(|e| invalid(e.to_string()))?;
        let origin = location.origin();
        if !origin.is_tuple() {
            return Err(invalid("location has an opaque origin".to_string()));
        }
        if config.source_origin_param.is_empty() {
            return Err(ConfigError::Malformed("source_origin_param is empty".to_string()));
        }
        http::HeaderName::from_bytes(config.allow_source_origin_header.as_bytes()).map_err(|_| {
            ConfigError::Malformed(format!(
                "{:?} is not a valid header name",
                config.allow_source_origin_header
            ))
        })?;
        let token = OriginToken(origin.ascii_serialization());
        Ok(Self {
            location,
            origin,
            token,
            single_document: config.single_document,
            source_origin_param: config.source_origin_param.clone(),
            allow_source_origin_header: config.allow_source_origin_header.to_ascii_lowercase(),
        })
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn origin_token(&self) -> &OriginToken {
        &self.token
    }

    /// Whether the host is a single addressable document. Interception is
    /// only attempted when it is.
    pub fn is_single_document(&self) -> bool {
        self.single_document
    }

    pub fn source_origin_param(&self) -> &str {
        &self.source_origin_param
    }

    pub fn allow_source_origin_header(&self) -> &str {
        &self.allow_source_origin_header
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }
}
