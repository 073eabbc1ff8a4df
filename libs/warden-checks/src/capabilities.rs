//! Capability-based endpoint authorization.
//!
//! A token carries a list of capability strings under a configurable
//! attribute path. [`CapabilitiesValidator`] grants the request when any one
//! of them is accepted by its [`EndpointChecker`] for the request's path and
//! method.

use std::fmt;
use std::sync::Arc;

use http::Extensions;
use regex::Regex;
use warden_core::{
    Authentication, BoxError, CheckError, Token, Validator, as_string_list, get_nested_attribute,
};

use crate::metric_validator::{CapabilitiesChecker, ParsedValues};

pub const DEFAULT_CAPABILITY_KEY: &str = "capabilities";

/// Decides whether a single capability grants access to an endpoint.
pub trait EndpointChecker: Send + Sync {
    /// `url` is the request path and `method` the request method as sent.
    fn authorized(&self, capability: &str, url: &str, method: &str) -> bool;

    /// Human-readable description, used in logs.
    fn name(&self) -> String;
}

/// Grants or denies everything.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysEndpointCheck(pub bool);

impl EndpointChecker for AlwaysEndpointCheck {
    fn authorized(&self, _capability: &str, _url: &str, _method: &str) -> bool {
        self.0
    }

    fn name(&self) -> String {
        format!("always {}", self.0)
    }
}

/// Grants when the capability equals a fixed string.
#[derive(Debug, Clone)]
pub struct ConstEndpointCheck(pub String);

impl EndpointChecker for ConstEndpointCheck {
    fn authorized(&self, capability: &str, _url: &str, _method: &str) -> bool {
        self.0 == capability
    }

    fn name(&self) -> String {
        self.0.clone()
    }
}

/// Parses capabilities of the form `{prefix}{url_regex}:{method}`.
///
/// The capability grants the request when `method` is the accept-all word or
/// the lower-cased request method, and `url_regex` matches the request path
/// starting at index 0.
#[derive(Debug, Clone)]
pub struct RegexEndpointCheck {
    prefix_to_match: Regex,
    accept_all_method: String,
}

impl RegexEndpointCheck {
    /// # Errors
    ///
    /// Returns an error if the capability pattern built from `prefix` does not compile.
    pub fn new(prefix: &str, accept_all_method: impl Into<String>) -> Result<Self, regex::Error> {
        let prefix_to_match = Regex::new(&format!("^{}(.+):(.+?)$", regex::escape(prefix)))?;
        Ok(Self {
            prefix_to_match,
            accept_all_method: accept_all_method.into(),
        })
    }
}

impl EndpointChecker for RegexEndpointCheck {
    fn authorized(&self, capability: &str, url: &str, method: &str) -> bool {
        let Some(caps) = self.prefix_to_match.captures(capability) else {
            return false;
        };
        let (Some(url_pattern), Some(cap_method)) = (caps.get(1), caps.get(2)) else {
            return false;
        };

        let cap_method = cap_method.as_str();
        if cap_method != self.accept_all_method && cap_method != method.to_lowercase() {
            return false;
        }

        // A capability with a malformed pattern grants nothing.
        let Ok(re) = Regex::new(url_pattern.as_str()) else {
            return false;
        };
        re.find(url).is_some_and(|m| m.start() == 0)
    }

    fn name(&self) -> String {
        format!(
            "regex prefix {} accepting all on {}",
            self.prefix_to_match.as_str(),
            self.accept_all_method
        )
    }
}

/// Checks the capabilities listed in a token against the request endpoint.
#[derive(Clone)]
pub struct CapabilitiesValidator {
    checker: Arc<dyn EndpointChecker>,
    capability_keys: Vec<String>,
}

impl CapabilitiesValidator {
    #[must_use]
    pub fn new(checker: Arc<dyn EndpointChecker>) -> Self {
        Self {
            checker,
            capability_keys: vec![DEFAULT_CAPABILITY_KEY.to_owned()],
        }
    }

    /// Attribute path holding the capability list.
    #[must_use]
    pub fn with_capability_keys(mut self, keys: Vec<String>) -> Self {
        self.capability_keys = keys;
        self
    }

    /// Check the capabilities of `auth`'s token against its request.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckError`] when the authentication is incomplete, has no
    /// usable capability list, or no capability grants the request.
    pub fn check_capabilities(&self, auth: &Authentication) -> Result<(), CheckError> {
        let token = auth.token.as_ref().ok_or(CheckError::NoToken)?;
        let url = auth.request.url.as_ref().ok_or(CheckError::NoUrl)?;
        if auth.request.method.is_empty() {
            return Err(CheckError::NoMethod);
        }
        let attributes = token.attributes().ok_or(CheckError::NilAttributes)?;

        let not_found = || CheckError::CapabilitiesNotFound {
            keys: self.capability_keys.clone(),
        };
        let value = get_nested_attribute(attributes, &self.capability_keys).ok_or_else(not_found)?;
        let capabilities = as_string_list(value).map_err(|_| not_found())?;
        if capabilities.is_empty() {
            return Err(CheckError::EmptyCapabilities);
        }

        let path = url.path();
        let method = auth.request.method.as_str();
        if capabilities
            .iter()
            .any(|c| self.checker.authorized(c, path, method))
        {
            return Ok(());
        }

        tracing::debug!(
            checker = %self.checker.name(),
            path,
            method,
            "no capability matched"
        );
        Err(CheckError::NoCapabilitiesMatch {
            capabilities,
            url: path.to_owned(),
            method: method.to_owned(),
        })
    }
}

impl fmt::Debug for CapabilitiesValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitiesValidator")
            .field("checker", &self.checker.name())
            .field("capability_keys", &self.capability_keys)
            .finish()
    }
}

impl Validator for CapabilitiesValidator {
    fn check(&self, ctx: &Extensions, _token: &Token) -> Result<(), BoxError> {
        let auth = Authentication::from_extensions(ctx).ok_or(CheckError::NoAuth)?;
        self.check_capabilities(auth).map_err(Into::into)
    }
}

impl CapabilitiesChecker for CapabilitiesValidator {
    fn check_authentication(
        &self,
        auth: &Authentication,
        _values: &ParsedValues,
    ) -> Result<(), BoxError> {
        self.check_capabilities(auth).map_err(Into::into)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use http::Uri;
    use serde_json::json;
    use warden_core::{Attributes, RequestInfo, reason_of, reasons};

    use super::*;

    fn regex_check() -> RegexEndpointCheck {
        RegexEndpointCheck::new("x1:webpa:api:", "all").unwrap()
    }

    fn auth(capabilities: serde_json::Value, method: &str, path: &'static str) -> Authentication {
        Authentication::new(
            "Bearer",
            Token::new(
                "jwt",
                "client",
                Attributes::try_from(json!({ "capabilities": capabilities })).unwrap(),
            ),
            RequestInfo::new(method, Uri::from_static(path)),
        )
    }

    #[test]
    fn always_and_const_checks() {
        assert!(AlwaysEndpointCheck(true).authorized("", "", ""));
        assert!(!AlwaysEndpointCheck(false).authorized("a", "/", "GET"));

        let c = ConstEndpointCheck("joweiafuoiuoiwauf".to_owned());
        assert!(c.authorized("joweiafuoiuoiwauf", "/", "GET"));
        assert!(!c.authorized("other", "/", "GET"));
    }

    #[test]
    fn regex_check_matches_method_and_url() {
        let check = regex_check();
        let url = "/test/endpoint";

        assert!(check.authorized("x1:webpa:api:/test/.*:all", url, "GET"));
        assert!(check.authorized("x1:webpa:api:/test/.*:get", url, "GET"));
        assert!(!check.authorized("x1:webpa:api:/test/.*:post", url, "GET"));
        assert!(!check.authorized("x1:webpa:api:/other/.*:all", url, "GET"));
        assert!(!check.authorized("x1:webpa:api:endpoint:all", url, "GET"));
        assert!(!check.authorized("d:webpa:api:/test/.*:all", url, "GET"));
        assert!(!check.authorized("x1:webpa:api:/test/(:all", url, "GET"));
    }

    #[test]
    fn validator_grants_on_any_match() {
        let v = CapabilitiesValidator::new(Arc::new(regex_check()));
        let a = auth(
            json!(["x1:webpa:api:/nope:all", "x1:webpa:api:/api/v2/.*:get"]),
            "GET",
            "/api/v2/device",
        );
        assert!(v.check_capabilities(&a).is_ok());
    }

    #[test]
    fn validator_failures_carry_reasons() {
        let v = CapabilitiesValidator::new(Arc::new(regex_check()));

        let none = auth(json!(["x1:webpa:api:/nope:all"]), "GET", "/api/v2/device");
        let err = v.check_capabilities(&none).unwrap_err();
        assert_eq!(err.reason(), reasons::NO_CAPABILITIES_MATCH);

        let empty = auth(json!([]), "GET", "/api");
        assert_eq!(
            v.check_capabilities(&empty).unwrap_err().reason(),
            reasons::EMPTY_CAPABILITIES
        );

        let wrong_type = auth(json!({ "a": 1 }), "GET", "/api");
        assert_eq!(
            v.check_capabilities(&wrong_type).unwrap_err().reason(),
            reasons::UNDETERMINED_CAPABILITIES
        );

        let keyed = v.with_capability_keys(vec!["elsewhere".to_owned()]);
        assert_eq!(
            keyed.check_capabilities(&empty).unwrap_err().reason(),
            reasons::UNDETERMINED_CAPABILITIES
        );
    }

    #[test]
    fn validator_reads_authentication_from_context() {
        let v = CapabilitiesValidator::new(Arc::new(AlwaysEndpointCheck(true)));
        let token = Token::new("jwt", "client", Attributes::new());

        let err = v.check(&Extensions::new(), &token).unwrap_err();
        assert_eq!(reason_of(&*err), Some(reasons::TOKEN_MISSING));

        let mut ctx = Extensions::new();
        auth(json!(["anything"]), "GET", "/").attach(&mut ctx);
        assert!(v.check(&ctx, &token).is_ok());
    }
}
