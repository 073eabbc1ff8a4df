use http::{Extensions, Uri};

use crate::token::Token;

/// The parts of the originating request that authorization decisions need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// HTTP method as sent by the client. Empty when unknown.
    pub method: String,
    /// Request URL after any configured transform (e.g. prefix stripping).
    pub url: Option<Uri>,
}

impl RequestInfo {
    #[must_use]
    pub fn new(method: impl Into<String>, url: Uri) -> Self {
        Self {
            method: method.into(),
            url: Some(url),
        }
    }
}

/// Per-request authentication envelope.
///
/// Built once by the constructor middleware and stored in the request's
/// [`Extensions`], which act as the request-scoped context for every later
/// stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authentication {
    /// Authorization scheme taken from the credential header, e.g. `"Basic"`.
    pub authorization: String,
    pub token: Option<Token>,
    pub request: RequestInfo,
}

impl Authentication {
    #[must_use]
    pub fn new(authorization: impl Into<String>, token: Token, request: RequestInfo) -> Self {
        Self {
            authorization: authorization.into(),
            token: Some(token),
            request,
        }
    }

    /// Read the authentication attached to a request-scoped context.
    #[must_use]
    pub fn from_extensions(ctx: &Extensions) -> Option<&Self> {
        ctx.get::<Self>()
    }

    /// Attach this authentication to a request-scoped context, replacing any previous one.
    pub fn attach(self, ctx: &mut Extensions) {
        ctx.insert(self);
    }
}
