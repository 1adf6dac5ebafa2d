//! URL helpers and the origin tagger.
//!
//! Cross-origin requests carry the caller's [`OriginToken`](crate::OriginToken)
//! in a query parameter. The responding server proves it produced the response
//! for this caller by echoing the token back in a header, which the verifier
//! checks. Same-origin requests need no such proof and are left untouched.

use url::Url;

use crate::config::Environment;
use crate::error::FetchError;
use crate::http::Request;

/// ASCII serialization of `url`'s origin, e.g. `https://example.com`.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Best-effort origin of a raw URL string, used when reporting failures for
/// inputs that never parsed.
pub fn origin_of_str(env: &Environment, raw: &str) -> String {
    match env.location().join(raw) {
        Ok(url) => origin_of(&url),
        Err(_) => "null".to_string(),
    }
}

/// Append the source-origin parameter to `url`.
///
/// Fails if the URL already carries the parameter: a caller-chosen value
/// would let a page claim someone else's origin.
pub fn with_cors_param(env: &Environment, url: &Url) -> Result<Url, FetchError> {
    let param = env.source_origin_param();
    if url.query_pairs().any(|(name, _)| name == param) {
        return Err(FetchError::invalid(format!(
            "source origin parameter {param:?} is not allowed in the request URL"
        )));
    }
    let mut tagged = url.clone();
    tagged
        .query_pairs_mut()
        .append_pair(param, env.origin_token().as_str());
    Ok(tagged)
}

/// Whether `request` was tagged and so must be origin-verified.
pub fn requires_origin_proof(env: &Environment, request: &Request) -> bool {
    request.cors && !env.is_same_origin(&request.url)
}

/// Return a copy of `request` whose URL carries the origin token, or an
/// unchanged copy when no tagging applies.
pub fn tag(env: &Environment, request: &Request) -> Result<Request, FetchError> {
    let mut tagged = request.clone();
    if requires_origin_proof(env, request) {
        tagged.url = with_cors_param(env, &request.url)?;
    }
    Ok(tagged)
}
