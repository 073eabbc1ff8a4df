//! Capability-check outcome metric.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `auth_capability_check` | Counter | `server`, `outcome`, `reason`, `clientid`, `partnerid`, `endpoint`, `method` |

use prometheus::{IntCounterVec, Opts, Registry};

pub const CAPABILITY_CHECK_OUTCOME: &str = "auth_capability_check";

pub const SERVER_LABEL: &str = "server";
pub const OUTCOME_LABEL: &str = "outcome";
pub const REASON_LABEL: &str = "reason";
pub const CLIENT_ID_LABEL: &str = "clientid";
pub const PARTNER_ID_LABEL: &str = "partnerid";
pub const ENDPOINT_LABEL: &str = "endpoint";
pub const METHOD_LABEL: &str = "method";

/// Label names in the order [`CheckLabels::values`] produces them.
pub const LABEL_NAMES: [&str; 7] = [
    SERVER_LABEL,
    OUTCOME_LABEL,
    REASON_LABEL,
    CLIENT_ID_LABEL,
    PARTNER_ID_LABEL,
    ENDPOINT_LABEL,
    METHOD_LABEL,
];

pub const ACCEPTED_OUTCOME: &str = "accepted";
pub const REJECTED_OUTCOME: &str = "rejected";

/// One capability-check observation.
///
/// Every field is always emitted, empty when unknown, so the counter's label
/// set never varies between call sites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckLabels<'a> {
    pub server: &'a str,
    pub outcome: &'a str,
    pub reason: &'a str,
    pub client_id: &'a str,
    pub partner_id: &'a str,
    pub endpoint: &'a str,
    pub method: &'a str,
}

impl<'a> CheckLabels<'a> {
    /// Label values ordered as [`LABEL_NAMES`].
    #[must_use]
    pub fn values(&self) -> [&'a str; 7] {
        [
            self.server,
            self.outcome,
            self.reason,
            self.client_id,
            self.partner_id,
            self.endpoint,
            self.method,
        ]
    }
}

/// Sink for capability-check observations. Must tolerate concurrent calls.
pub trait CapabilityCheckRecorder: Send + Sync {
    fn record(&self, labels: &CheckLabels<'_>);
}

/// Prometheus-backed recorder.
#[derive(Clone)]
pub struct AuthCapabilityCheckMeasures {
    capability_check_outcome: IntCounterVec,
}

impl AuthCapabilityCheckMeasures {
    /// Create the counter and register it with `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let capability_check_outcome = IntCounterVec::new(
            Opts::new(
                CAPABILITY_CHECK_OUTCOME,
                "Counter for the capability checks, with outcome and reason labels",
            ),
            &LABEL_NAMES,
        )?;
        registry.register(Box::new(capability_check_outcome.clone()))?;
        Ok(Self {
            capability_check_outcome,
        })
    }

    /// Current count for an exact label set.
    #[must_use]
    pub fn count(&self, labels: &CheckLabels<'_>) -> u64 {
        self.capability_check_outcome
            .with_label_values(&labels.values())
            .get()
    }
}

impl CapabilityCheckRecorder for AuthCapabilityCheckMeasures {
    fn record(&self, labels: &CheckLabels<'_>) {
        self.capability_check_outcome
            .with_label_values(&labels.values())
            .inc();
    }
}
