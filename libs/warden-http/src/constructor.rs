//! Authentication-constructing middleware.
//!
//! Reads the credential header, hands it to the token factory registered for
//! its scheme, and stores the resulting [`Authentication`] in the request
//! extensions for later stages.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use http::Request;
use http::request::Parts;
use tower::{Layer, Service};
use warden_core::{Authentication, BoxError, RequestInfo};

use crate::response::{ErrorResponseReason, OnErrorHttpResponse, default_on_error_http_response};
use crate::token_factory::TokenFactory;
use crate::url::{ParseUrlFn, default_parse_url};

pub const DEFAULT_HEADER_NAME: &str = "Authorization";
pub const DEFAULT_HEADER_DELIMITER: &str = " ";

#[derive(Debug, thiserror::Error)]
pub enum ConstructorError {
    #[error("authorization header \"{name}\" not found")]
    MissingHeader { name: String },

    #[error("unexpected format in authorization header \"{name}\"")]
    InvalidHeader { name: String },

    #[error("key not supported: \"{scheme}\"")]
    KeyNotSupported { scheme: String },
}

struct ConstructorState {
    header_name: String,
    header_delimiter: String,
    factories: HashMap<String, Arc<dyn TokenFactory>>,
    parse_url: ParseUrlFn,
    on_error: OnErrorHttpResponse,
}

type Rejection = (ErrorResponseReason, BoxError);

impl ConstructorState {
    async fn authenticate(&self, parts: &Parts) -> Result<Authentication, Rejection> {
        let url = (self.parse_url)(&parts.uri)
            .map_err(|e| (ErrorResponseReason::GetUrlFailed, e.into()))?;

        let header = parts
            .headers
            .get(self.header_name.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                let err = ConstructorError::MissingHeader {
                    name: self.header_name.clone(),
                };
                (ErrorResponseReason::MissingHeader, err.into())
            })?;

        let invalid = || {
            let err = ConstructorError::InvalidHeader {
                name: self.header_name.clone(),
            };
            (ErrorResponseReason::InvalidHeader, BoxError::from(err))
        };
        let header = header.to_str().map_err(|_| invalid())?;
        let (scheme, value) = match header.find(self.header_delimiter.as_str()) {
            Some(i) if i >= 1 => (&header[..i], &header[i + self.header_delimiter.len()..]),
            _ => return Err(invalid()),
        };

        let factory = self.factories.get(scheme).ok_or_else(|| {
            let err = ConstructorError::KeyNotSupported {
                scheme: scheme.to_owned(),
            };
            (ErrorResponseReason::KeyNotSupported, err.into())
        })?;

        let token = factory
            .parse_and_validate(parts, scheme, value)
            .await
            .map_err(|e| (ErrorResponseReason::ParseFailed, e))?;

        Ok(Authentication::new(
            scheme,
            token,
            RequestInfo::new(parts.method.as_str(), url),
        ))
    }

    fn reject(&self, reason: ErrorResponseReason, err: &(dyn StdError + 'static)) -> Response {
        tracing::debug!(
            reason = %reason,
            error = %err,
            "request rejected while constructing authentication"
        );
        (self.on_error)(reason, err)
    }
}

/// Builder for [`ConstructorLayer`].
///
/// # Example
/// ```ignore
/// let layer = ConstructorBuilder::new()
///     .token_factory("Basic", Arc::new(BasicTokenFactory::new(users)))
///     .build();
/// router = router.layer(layer);
/// ```
pub struct ConstructorBuilder {
    header_name: String,
    header_delimiter: String,
    factories: HashMap<String, Arc<dyn TokenFactory>>,
    parse_url: ParseUrlFn,
    on_error: OnErrorHttpResponse,
}

impl Default for ConstructorBuilder {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_owned(),
            header_delimiter: DEFAULT_HEADER_DELIMITER.to_owned(),
            factories: HashMap::new(),
            parse_url: default_parse_url(),
            on_error: Arc::new(default_on_error_http_response),
        }
    }
}

impl ConstructorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header carrying the credential. An empty name keeps the current one.
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.header_name = name;
        }
        self
    }

    /// Separator between scheme and credential. An empty delimiter keeps the current one.
    #[must_use]
    pub fn header_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        if !delimiter.is_empty() {
            self.header_delimiter = delimiter;
        }
        self
    }

    /// Register the factory for a scheme. Schemes match case-sensitively.
    #[must_use]
    pub fn token_factory(mut self, scheme: impl Into<String>, factory: Arc<dyn TokenFactory>) -> Self {
        self.factories.insert(scheme.into(), factory);
        self
    }

    #[must_use]
    pub fn parse_url(mut self, parse_url: ParseUrlFn) -> Self {
        self.parse_url = parse_url;
        self
    }

    #[must_use]
    pub fn on_error_http_response(mut self, on_error: OnErrorHttpResponse) -> Self {
        self.on_error = on_error;
        self
    }

    #[must_use]
    pub fn build(self) -> ConstructorLayer {
        ConstructorLayer {
            state: Arc::new(ConstructorState {
                header_name: self.header_name,
                header_delimiter: self.header_delimiter,
                factories: self.factories,
                parse_url: self.parse_url,
                on_error: self.on_error,
            }),
        }
    }
}

/// Layer that attaches an [`Authentication`] to every request it lets through.
#[derive(Clone)]
pub struct ConstructorLayer {
    state: Arc<ConstructorState>,
}

impl<S> Layer<S> for ConstructorLayer {
    type Service = ConstructorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ConstructorService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ConstructorService<S> {
    inner: S,
    state: Arc<ConstructorState>,
}

impl<S> Service<Request<Body>> for ConstructorService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            let (mut parts, body) = request.into_parts();
            match state.authenticate(&parts).await {
                Ok(auth) => {
                    auth.attach(&mut parts.extensions);
                    ready_inner.call(Request::from_parts(parts, body)).await
                }
                Err((reason, err)) => Ok(state.reject(reason, &*err)),
            }
        })
    }
}
