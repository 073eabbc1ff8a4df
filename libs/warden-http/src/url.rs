//! Request URL transforms applied before authentication.

use std::sync::Arc;

use http::Uri;
use http::uri::PathAndQuery;

#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("unexpected URL \"{path}\", did not start with expected prefix \"{prefix}\"")]
    MissingPrefix { prefix: String, path: String },

    #[error("invalid URL: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),

    #[error("invalid URL parts: {0}")]
    InvalidUriParts(#[from] http::uri::InvalidUriParts),
}

/// Maps the incoming request URL to the one recorded in the authentication.
pub type ParseUrlFn = Arc<dyn Fn(&Uri) -> Result<Uri, UrlError> + Send + Sync>;

/// Identity transform.
#[must_use]
pub fn default_parse_url() -> ParseUrlFn {
    Arc::new(|uri: &Uri| Ok(uri.clone()))
}

/// Strip `prefix` from the request path, then apply `next` if given.
///
/// A path that does not start with `prefix` is an error. The remaining path
/// always begins with `/`, and the query string is kept.
#[must_use]
pub fn remove_prefix_url_fn(prefix: impl Into<String>, next: Option<ParseUrlFn>) -> ParseUrlFn {
    let prefix = prefix.into();
    Arc::new(move |uri: &Uri| {
        let stripped = strip_prefix(uri, &prefix)?;
        if let Some(next) = &next {
            return next(&stripped);
        }
        Ok(stripped)
    })
}

fn strip_prefix(uri: &Uri, prefix: &str) -> Result<Uri, UrlError> {
    let Some(rest) = uri.path().strip_prefix(prefix) else {
        return Err(UrlError::MissingPrefix {
            prefix: prefix.to_owned(),
            path: uri.path().to_owned(),
        });
    };

    let mut path_and_query = String::with_capacity(rest.len() + 1);
    if !rest.starts_with('/') {
        path_and_query.push('/');
    }
    path_and_query.push_str(rest);
    if let Some(query) = uri.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}
