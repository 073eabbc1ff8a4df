//! Error taxonomy and metric reasons.
//!
//! A *reason* is a short, low-cardinality string used only as a metric label.
//! Three error types carry one: [`CheckError`], [`ReasonError`] and
//! [`ValidationErrors`]. Callers that hold an arbitrary error ask
//! [`reason_of`], which walks the `source()` chain and downcasts each link to
//! those types in that fixed order.

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

/// Boxed error returned by validators and external collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub mod reasons {
    //! Metric reason strings.

    pub const UNKNOWN: &str = "unknown";
    pub const TOKEN_MISSING: &str = "token_missing";
    pub const NO_TOKEN: &str = "no_token";
    pub const NO_METHOD: &str = "no_method";
    pub const NIL_ATTRIBUTES: &str = "nil_attributes";
    pub const NO_URL: &str = "no_url";
    pub const UNDETERMINED_PARTNER_ID: &str = "undetermined_partner_id";
    pub const MULTIPLE_ERRORS: &str = "multiple_errors";
    pub const EMPTY_TYPE: &str = "empty_type";
    pub const INVALID_TYPE: &str = "invalid_type";
    pub const EMPTY_PRINCIPAL: &str = "empty_principal";
    pub const UNDETERMINED_CAPABILITIES: &str = "undetermined_capabilities";
    pub const EMPTY_CAPABILITIES: &str = "empty_capabilities";
    pub const NO_CAPABILITIES_MATCH: &str = "no_capabilities_match";
}

/// Failures detected by the built-in checks.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("no authentication found in request context")]
    NoAuth,

    #[error("no token found in authentication")]
    NoToken,

    #[error("no method found in authentication request")]
    NoMethod,

    #[error("token has no attributes")]
    NilAttributes,

    #[error("no url found in authentication request")]
    NoUrl,

    #[error("couldn't get partner IDs from attributes using keys {}", keys.join("."))]
    PartnerIdsNotFound { keys: Vec<String> },

    #[error("expected a string list for partner IDs \"{value}\"")]
    PartnerIdsNotStringList { value: Value },

    #[error("empty token type")]
    EmptyType,

    #[error("token type \"{token_type}\" is not allowed")]
    InvalidType { token_type: String },

    #[error("empty principal")]
    EmptyPrincipal,

    #[error("couldn't get capabilities using keys {}", keys.join("."))]
    CapabilitiesNotFound { keys: Vec<String> },

    #[error("token has an empty capability list")]
    EmptyCapabilities,

    #[error("no capability in [{}] allows {method} on {url}", capabilities.join(", "))]
    NoCapabilitiesMatch {
        capabilities: Vec<String>,
        url: String,
        method: String,
    },

    #[error("endpoint auth for {method} on {path} failed: {source}")]
    CapabilityCheckFailed {
        method: String,
        path: String,
        #[source]
        source: BoxError,
    },
}

impl CheckError {
    /// Metric reason for this failure.
    ///
    /// `CapabilityCheckFailed` reports the reason of the wrapped error.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::NoAuth => reasons::TOKEN_MISSING,
            Self::NoToken => reasons::NO_TOKEN,
            Self::NoMethod => reasons::NO_METHOD,
            Self::NilAttributes => reasons::NIL_ATTRIBUTES,
            Self::NoUrl => reasons::NO_URL,
            Self::PartnerIdsNotFound { .. } | Self::PartnerIdsNotStringList { .. } => {
                reasons::UNDETERMINED_PARTNER_ID
            }
            Self::EmptyType => reasons::EMPTY_TYPE,
            Self::InvalidType { .. } => reasons::INVALID_TYPE,
            Self::EmptyPrincipal => reasons::EMPTY_PRINCIPAL,
            Self::CapabilitiesNotFound { .. } => reasons::UNDETERMINED_CAPABILITIES,
            Self::EmptyCapabilities => reasons::EMPTY_CAPABILITIES,
            Self::NoCapabilitiesMatch { .. } => reasons::NO_CAPABILITIES_MATCH,
            Self::CapabilityCheckFailed { source, .. } => {
                reason_of(&**source).unwrap_or(reasons::UNKNOWN)
            }
        }
    }
}

/// Wraps any error with a caller-chosen metric reason.
///
/// Displays as the wrapped error.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ReasonError {
    reason: String,
    #[source]
    source: BoxError,
}

impl ReasonError {
    #[must_use]
    pub fn new(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            reason: reason.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Every failure produced by one run of a [`crate::Validators`] chain, in call order.
#[derive(Debug, Default)]
pub struct ValidationErrors(Vec<BoxError>);

impl ValidationErrors {
    #[must_use]
    pub fn new(errors: Vec<BoxError>) -> Self {
        Self(errors)
    }

    #[must_use]
    pub fn errors(&self) -> &[BoxError] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The sole member's reason when there is exactly one member, otherwise
    /// [`reasons::MULTIPLE_ERRORS`]. Per-member reasons stay available
    /// through [`ValidationErrors::errors`].
    #[must_use]
    pub fn reason(&self) -> &str {
        match self.0.as_slice() {
            [only] => reason_of(&**only).unwrap_or(reasons::UNKNOWN),
            _ => reasons::MULTIPLE_ERRORS,
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("multiple errors: [")?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }
        f.write_str("]")
    }
}

impl StdError for ValidationErrors {}

/// Find the metric reason carried by `err` or anything in its source chain.
///
/// Returns `None` when no link carries a reason; callers fall back to
/// [`reasons::UNKNOWN`].
#[must_use]
pub fn reason_of<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a str> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(r) = e.downcast_ref::<ReasonError>() {
            return Some(r.reason());
        }
        if let Some(v) = e.downcast_ref::<ValidationErrors>() {
            return Some(v.reason());
        }
        if let Some(c) = e.downcast_ref::<CheckError>() {
            return Some(c.reason());
        }
        current = e.source();
    }
    None
}
