use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constructor::{ConstructorBuilder, DEFAULT_HEADER_DELIMITER, DEFAULT_HEADER_NAME};
use crate::enforcer::{EnforcerBuilder, NotFoundBehavior};
use crate::response::{
    OnErrorHttpResponse, default_on_error_http_response, legacy_on_error_http_response,
};
use crate::token_factory::BasicTokenFactory;
use crate::url::remove_prefix_url_fn;

pub const BASIC_SCHEME: &str = "Basic";

/// Authentication middleware settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct AuthConfig {
    pub header_name: String,
    pub header_delimiter: String,
    /// Path prefix removed from request URLs before authentication.
    /// Requests without it are rejected.
    pub strip_prefix: Option<String>,
    /// Answer an unsupported scheme with 403 and no challenge header.
    pub legacy_error_responses: bool,
    pub not_found_behavior: NotFoundBehavior,
    /// Users accepted by the `Basic` scheme, username to password.
    /// The scheme is only registered when this is non-empty.
    pub basic_users: HashMap<String, String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_owned(),
            header_delimiter: DEFAULT_HEADER_DELIMITER.to_owned(),
            strip_prefix: None,
            legacy_error_responses: false,
            not_found_behavior: NotFoundBehavior::default(),
            basic_users: HashMap::new(),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn on_error_http_response(&self) -> OnErrorHttpResponse {
        if self.legacy_error_responses {
            Arc::new(legacy_on_error_http_response)
        } else {
            Arc::new(default_on_error_http_response)
        }
    }

    /// Constructor builder populated from this config. Further token
    /// factories can be registered on the result.
    #[must_use]
    pub fn constructor(&self) -> ConstructorBuilder {
        let mut builder = ConstructorBuilder::new()
            .header_name(self.header_name.as_str())
            .header_delimiter(self.header_delimiter.as_str())
            .on_error_http_response(self.on_error_http_response());
        if let Some(prefix) = &self.strip_prefix {
            builder = builder.parse_url(remove_prefix_url_fn(prefix.as_str(), None));
        }
        if !self.basic_users.is_empty() {
            builder = builder.token_factory(
                BASIC_SCHEME,
                Arc::new(BasicTokenFactory::new(self.basic_users.clone())),
            );
        }
        builder
    }

    /// Enforcer builder populated from this config. Rule sets are added by the caller.
    #[must_use]
    pub fn enforcer(&self) -> EnforcerBuilder {
        EnforcerBuilder::new()
            .not_found_behavior(self.not_found_behavior)
            .on_error_http_response(self.on_error_http_response())
    }
}
