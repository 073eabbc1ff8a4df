use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::capabilities::{DEFAULT_CAPABILITY_KEY, RegexEndpointCheck};
use crate::metric_validator::DEFAULT_PARTNER_KEYS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint pattern \"{pattern}\": {source}")]
    InvalidEndpoint {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid capability prefix \"{prefix}\": {source}")]
    InvalidCapabilityPrefix {
        prefix: String,
        #[source]
        source: regex::Error,
    },
}

/// Capability check settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct CapabilityCheckConfig {
    /// Value of the `server` metric label.
    pub server: String,
    /// Endpoint patterns used to bucket request paths. Order matters: the
    /// first pattern matching at the start of the path wins.
    pub endpoints: Vec<String>,
    /// Attribute path of the partner list.
    pub partner_keys: Vec<String>,
    /// Reject failing requests instead of only recording them.
    pub error_out: bool,
    /// Attribute path of the capability list.
    pub capability_keys: Vec<String>,
    pub capability_prefix: String,
    /// Capability method word that grants every HTTP method.
    pub accept_all_method: String,
}

impl Default for CapabilityCheckConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            endpoints: Vec::new(),
            partner_keys: DEFAULT_PARTNER_KEYS.iter().map(|k| (*k).to_owned()).collect(),
            error_out: false,
            capability_keys: vec![DEFAULT_CAPABILITY_KEY.to_owned()],
            capability_prefix: String::new(),
            accept_all_method: "all".to_owned(),
        }
    }
}

impl CapabilityCheckConfig {
    /// Compile the endpoint patterns, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] for the first pattern that fails to compile.
    pub fn compile_endpoints(&self) -> Result<Vec<Regex>, ConfigError> {
        self.endpoints
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidEndpoint {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCapabilityPrefix`] if the capability pattern does not compile.
    pub fn endpoint_check(&self) -> Result<RegexEndpointCheck, ConfigError> {
        RegexEndpointCheck::new(&self.capability_prefix, self.accept_all_method.clone()).map_err(
            |source| ConfigError::InvalidCapabilityPrefix {
                prefix: self.capability_prefix.clone(),
                source,
            },
        )
    }
}
