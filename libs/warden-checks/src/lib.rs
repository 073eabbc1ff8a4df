#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Built-in validators, capability checks and the metric-recording
//! capability pipeline.

pub mod capabilities;
pub mod config;
pub mod labels;
pub mod measures;
pub mod metric_validator;
pub mod validators;

pub use capabilities::{
    AlwaysEndpointCheck, CapabilitiesValidator, ConstEndpointCheck, EndpointChecker,
    RegexEndpointCheck,
};
pub use config::{CapabilityCheckConfig, ConfigError};
pub use labels::{determine_endpoint_metric, determine_partner_metric};
pub use measures::{AuthCapabilityCheckMeasures, CapabilityCheckRecorder, CheckLabels};
pub use metric_validator::{CapabilitiesChecker, MetricValidator, ParsedValues};
pub use validators::{AllowAll, NonEmptyPrincipal, NonEmptyType, ValidType};
