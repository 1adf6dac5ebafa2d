//! Response verifier.
//!
//! Two independent checks run on every dispatched response, intercepted or
//! not. Both read only the status line and headers.
//!
//! - Origin proof: when the request was tagged, the response must echo the
//!   caller's origin token in the allow-source-origin header. A cache that
//!   served another origin's response fails here.
//! - Status: unless failures are allowed, the status must be 2xx.

use tracing::debug;

use crate::config::Environment;
use crate::error::FetchError;
use crate::http::{Request, Response};
use crate::origin::{origin_of, requires_origin_proof};

pub fn verify(env: &Environment, request: &Request, response: Response) -> Result<Response, FetchError> {
    if requires_origin_proof(env, request) {
        check_origin_proof(env, request, &response)?;
    }
    if !request.allow_failure && !response.ok() {
        debug!(status = response.status, "rejecting non-success status");
        return Err(FetchError::HttpError {
            status: response.status,
            response: Box::new(response),
        });
    }
    Ok(response)
}

fn check_origin_proof(env: &Environment, request: &Request, response: &Response) -> Result<(), FetchError> {
    let expected = env.origin_token().as_str();
    match response.header(env.allow_source_origin_header()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(FetchError::CorsVerificationFailed {
            target_origin: origin_of(&request.url),
        }),
    }
}
