#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tower layers that authenticate requests and enforce per-scheme rule sets.
//!
//! Apply [`ConstructorLayer`] outside [`EnforcerLayer`] so the enforcer sees
//! the [`warden_core::Authentication`] the constructor attaches.

pub mod config;
pub mod constructor;
pub mod enforcer;
pub mod response;
pub mod token_factory;
pub mod url;

pub use config::AuthConfig;
pub use constructor::{ConstructorBuilder, ConstructorError, ConstructorLayer, ConstructorService};
pub use enforcer::{EnforcerBuilder, EnforcerError, EnforcerLayer, EnforcerService, NotFoundBehavior};
pub use response::{
    ErrorHeaderer, ErrorResponseReason, ErrorStatusCoder, OnErrorHttpResponse,
    default_on_error_http_response, legacy_on_error_http_response, write_response,
};
pub use token_factory::{BasicTokenError, BasicTokenFactory, TokenFactory};
pub use url::{ParseUrlFn, UrlError, default_parse_url, remove_prefix_url_fn};
