//! Translating middleware failures into HTTP responses.
//!
//! Errors may carry response hints. An [`ErrorHeaderer`] anywhere in the
//! error's source chain contributes headers; an [`ErrorStatusCoder`] overrides
//! the status the middleware would otherwise use. [`write_response`] applies
//! both.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderMap, HeaderValue, StatusCode};
use warden_core::BoxError;

/// Why a request was rejected before reaching the protected handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorResponseReason {
    MissingHeader,
    InvalidHeader,
    KeyNotSupported,
    ParseFailed,
    GetUrlFailed,
    MissingAuthentication,
    ChecksNotFound,
    ChecksFailed,
}

impl ErrorResponseReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidHeader => "invalid_header",
            Self::KeyNotSupported => "key_not_supported",
            Self::ParseFailed => "parse_failed",
            Self::GetUrlFailed => "get_url_failed",
            Self::MissingAuthentication => "missing_authentication",
            Self::ChecksNotFound => "checks_not_found",
            Self::ChecksFailed => "checks_failed",
        }
    }
}

impl fmt::Display for ErrorResponseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the response for a rejected request.
pub type OnErrorHttpResponse =
    Arc<dyn Fn(ErrorResponseReason, &(dyn StdError + 'static)) -> Response + Send + Sync>;

/// An error that asks for extra headers on the error response.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ErrorHeaderer {
    #[source]
    source: BoxError,
    headers: HeaderMap,
}

impl ErrorHeaderer {
    #[must_use]
    pub fn new(source: impl Into<BoxError>, headers: HeaderMap) -> Self {
        Self {
            source: source.into(),
            headers,
        }
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// An error that supplies its own response status.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ErrorStatusCoder {
    #[source]
    source: BoxError,
    status: StatusCode,
}

impl ErrorStatusCoder {
    #[must_use]
    pub fn new(source: impl Into<BoxError>, status: StatusCode) -> Self {
        Self {
            source: source.into(),
            status,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }
}

fn chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |e: &&'a (dyn StdError + 'static)| (*e).source())
}

/// Set the status and headers of `response` from `err`.
///
/// Headers from the first [`ErrorHeaderer`] in the chain are appended. The
/// status is taken from the first [`ErrorStatusCoder`] in the chain, or
/// `default_status` when there is none.
pub fn write_response(
    response: &mut Response,
    default_status: StatusCode,
    err: &(dyn StdError + 'static),
) {
    if let Some(h) = chain(err).find_map(|e| e.downcast_ref::<ErrorHeaderer>()) {
        for (name, value) in h.headers() {
            response.headers_mut().append(name, value.clone());
        }
    }

    *response.status_mut() = chain(err)
        .find_map(|e| e.downcast_ref::<ErrorStatusCoder>())
        .map_or(default_status, ErrorStatusCoder::status_code);
}

fn default_status(reason: ErrorResponseReason) -> StatusCode {
    match reason {
        ErrorResponseReason::MissingHeader | ErrorResponseReason::KeyNotSupported => {
            StatusCode::UNAUTHORIZED
        }
        ErrorResponseReason::InvalidHeader => StatusCode::BAD_REQUEST,
        ErrorResponseReason::ParseFailed
        | ErrorResponseReason::GetUrlFailed
        | ErrorResponseReason::MissingAuthentication
        | ErrorResponseReason::ChecksNotFound
        | ErrorResponseReason::ChecksFailed => StatusCode::FORBIDDEN,
    }
}

/// Default translator: 401 for a missing header or unsupported scheme, 400
/// for a malformed header, 403 otherwise. A 401 carries
/// `WWW-Authenticate: Bearer` unless the error supplied its own challenge.
#[must_use]
pub fn default_on_error_http_response(
    reason: ErrorResponseReason,
    err: &(dyn StdError + 'static),
) -> Response {
    let mut response = Response::new(Body::empty());
    write_response(&mut response, default_status(reason), err);
    if response.status() == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .entry(WWW_AUTHENTICATE)
            .or_insert(HeaderValue::from_static("Bearer"));
    }
    response
}

/// Older translator kept for deployments that relied on its statuses: an
/// unsupported scheme is 403, and no `WWW-Authenticate` header is added.
#[must_use]
pub fn legacy_on_error_http_response(
    reason: ErrorResponseReason,
    err: &(dyn StdError + 'static),
) -> Response {
    let status = match reason {
        ErrorResponseReason::KeyNotSupported => StatusCode::FORBIDDEN,
        other => default_status(other),
    };
    let mut response = Response::new(Body::empty());
    write_response(&mut response, status, err);
    response
}
