//! Rule-enforcing middleware.
//!
//! Looks up the rule set for the scheme of the request's [`Authentication`]
//! and runs it. The protected handler is only reached when every rule passes,
//! or when no rule set exists and [`NotFoundBehavior::Allow`] is configured.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use http::{Extensions, Request};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};
use warden_core::{Authentication, BoxError, CheckError, Validator, Validators};

use crate::response::{ErrorResponseReason, OnErrorHttpResponse, default_on_error_http_response};

/// What to do with a request whose scheme has no rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundBehavior {
    #[default]
    Forbid,
    Allow,
}

#[derive(Debug, thiserror::Error)]
pub enum EnforcerError {
    #[error("no authentication found")]
    MissingAuthentication,

    #[error("no rules found for authorization \"{scheme}\"")]
    ChecksNotFound { scheme: String },
}

struct EnforcerState {
    rules: HashMap<String, Validators>,
    not_found_behavior: NotFoundBehavior,
    on_error: OnErrorHttpResponse,
}

impl EnforcerState {
    fn enforce(&self, ctx: &Extensions) -> Result<(), (ErrorResponseReason, BoxError)> {
        let auth = Authentication::from_extensions(ctx).ok_or_else(|| {
            (
                ErrorResponseReason::MissingAuthentication,
                EnforcerError::MissingAuthentication.into(),
            )
        })?;

        let Some(rules) = self.rules.get(&auth.authorization) else {
            return match self.not_found_behavior {
                NotFoundBehavior::Allow => Ok(()),
                NotFoundBehavior::Forbid => Err((
                    ErrorResponseReason::ChecksNotFound,
                    EnforcerError::ChecksNotFound {
                        scheme: auth.authorization.clone(),
                    }
                    .into(),
                )),
            };
        };

        let token = auth
            .token
            .as_ref()
            .ok_or_else(|| (ErrorResponseReason::ChecksFailed, CheckError::NoToken.into()))?;
        rules
            .check(ctx, token)
            .map_err(|e| (ErrorResponseReason::ChecksFailed, e))
    }
}

/// Builder for [`EnforcerLayer`].
pub struct EnforcerBuilder {
    rules: HashMap<String, Validators>,
    not_found_behavior: NotFoundBehavior,
    on_error: OnErrorHttpResponse,
}

impl Default for EnforcerBuilder {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            not_found_behavior: NotFoundBehavior::default(),
            on_error: Arc::new(default_on_error_http_response),
        }
    }
}

impl EnforcerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule set for a scheme, replacing any earlier one.
    #[must_use]
    pub fn rules(mut self, scheme: impl Into<String>, rules: Validators) -> Self {
        self.rules.insert(scheme.into(), rules);
        self
    }

    #[must_use]
    pub fn not_found_behavior(mut self, behavior: NotFoundBehavior) -> Self {
        self.not_found_behavior = behavior;
        self
    }

    #[must_use]
    pub fn on_error_http_response(mut self, on_error: OnErrorHttpResponse) -> Self {
        self.on_error = on_error;
        self
    }

    #[must_use]
    pub fn build(self) -> EnforcerLayer {
        EnforcerLayer {
            state: Arc::new(EnforcerState {
                rules: self.rules,
                not_found_behavior: self.not_found_behavior,
                on_error: self.on_error,
            }),
        }
    }
}

/// Layer that rejects requests failing their scheme's rule set.
#[derive(Clone)]
pub struct EnforcerLayer {
    state: Arc<EnforcerState>,
}

impl<S> Layer<S> for EnforcerLayer {
    type Service = EnforcerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EnforcerService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct EnforcerService<S> {
    inner: S,
    state: Arc<EnforcerState>,
}

impl<S> Service<Request<Body>> for EnforcerService<S>
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
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        if let Err((reason, err)) = self.state.enforce(request.extensions()) {
            tracing::debug!(
                reason = %reason,
                error = %err,
                "request rejected by enforcer"
            );
            let response = (self.state.on_error)(reason, &*err);
            return Box::pin(async move { Ok(response) });
        }

        Box::pin(async move { ready_inner.call(request).await })
    }
}
