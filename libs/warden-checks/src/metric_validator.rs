//! Capability-check pipeline.
//!
//! [`MetricValidator`] derives metric labels from the request's
//! [`Authentication`], asks a [`CapabilitiesChecker`] whether the request is
//! allowed, and records exactly one observation per request. In strict mode
//! (`error_out`) failures reject the request; otherwise they are only
//! recorded, which lets operators watch the decision before enforcing it.

use std::fmt;
use std::sync::Arc;

use http::Extensions;
use regex::Regex;
use warden_core::{
    Authentication, BoxError, CheckError, Token, Validator, as_string_list, get_nested_attribute,
    reason_of, reasons,
};

use crate::labels::{determine_endpoint_metric, determine_partner_metric};
use crate::measures::{ACCEPTED_OUTCOME, CapabilityCheckRecorder, CheckLabels, REJECTED_OUTCOME};

/// Default attribute path holding a token's partner list.
pub const DEFAULT_PARTNER_KEYS: [&str; 2] = ["allowedResources", "allowedPartners"];

/// Labels computed from a request for the capability decision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedValues {
    /// Source text of the endpoint pattern matching the request path, or
    /// `"not_recognized"`. Stable across requests to the same endpoint.
    pub endpoint: String,
    /// Partner classification: `none`, `wildcard`, `many`, or a single partner id.
    pub partner: String,
}

/// Decides whether an authenticated request may proceed.
pub trait CapabilitiesChecker: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the request is not authorized. A reason-carrying
    /// error (see [`warden_core::reason_of`]) sets the metric's reason label.
    fn check_authentication(&self, auth: &Authentication, values: &ParsedValues)
    -> Result<(), BoxError>;
}

impl<F> CapabilitiesChecker for F
where
    F: Fn(&Authentication, &ParsedValues) -> Result<(), BoxError> + Send + Sync,
{
    fn check_authentication(
        &self,
        auth: &Authentication,
        values: &ParsedValues,
    ) -> Result<(), BoxError> {
        self(auth, values)
    }
}

/// Labels gathered before the capability decision. `client` is filled as soon
/// as the principal is known so shape failures past that point still report it.
#[derive(Default)]
struct Prepared {
    client: String,
    partner: String,
    endpoint: String,
}

/// Validator that runs a capability decision and records its outcome.
#[derive(Clone)]
pub struct MetricValidator {
    checker: Arc<dyn CapabilitiesChecker>,
    measures: Arc<dyn CapabilityCheckRecorder>,
    endpoints: Arc<[Regex]>,
    partner_keys: Arc<[String]>,
    error_out: bool,
    server: String,
}

impl MetricValidator {
    /// Create a permissive validator with no endpoint patterns and the
    /// default partner key path.
    #[must_use]
    pub fn new(
        checker: Arc<dyn CapabilitiesChecker>,
        measures: Arc<dyn CapabilityCheckRecorder>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            checker,
            measures,
            endpoints: Arc::from(Vec::new()),
            partner_keys: DEFAULT_PARTNER_KEYS.iter().map(|k| (*k).to_owned()).collect(),
            error_out: false,
            server: server.into(),
        }
    }

    /// Endpoint patterns, tried in the given order.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<Regex>) -> Self {
        self.endpoints = endpoints.into();
        self
    }

    #[must_use]
    pub fn with_partner_keys(mut self, keys: Vec<String>) -> Self {
        self.partner_keys = keys.into();
        self
    }

    /// Reject failing requests instead of only recording them.
    #[must_use]
    pub fn with_error_out(mut self, error_out: bool) -> Self {
        self.error_out = error_out;
        self
    }

    #[must_use]
    pub fn server(&self) -> &str {
        &self.server
    }

    #[must_use]
    pub fn error_out(&self) -> bool {
        self.error_out
    }

    fn failure_outcome(&self) -> &'static str {
        if self.error_out {
            REJECTED_OUTCOME
        } else {
            ACCEPTED_OUTCOME
        }
    }

    /// Run the pipeline against the authentication found in a request context.
    ///
    /// # Errors
    ///
    /// Only in strict mode: [`CheckError::NoAuth`] when `auth` is `None`, the
    /// shape error when the authentication is incomplete, or
    /// [`CheckError::CapabilityCheckFailed`] when the checker denies the request.
    pub fn check_authentication(&self, auth: Option<&Authentication>) -> Result<(), BoxError> {
        let failure_outcome = self.failure_outcome();

        let Some(auth) = auth else {
            self.measures.record(&CheckLabels {
                server: &self.server,
                outcome: failure_outcome,
                reason: reasons::TOKEN_MISSING,
                ..CheckLabels::default()
            });
            tracing::debug!(server = %self.server, "capability check: no authentication in context");
            return self.fail(CheckError::NoAuth.into());
        };

        let mut prepared = Prepared::default();
        let prep = self.prep_metrics(auth, &mut prepared);
        let mut labels = CheckLabels {
            server: &self.server,
            outcome: ACCEPTED_OUTCOME,
            reason: "",
            client_id: &prepared.client,
            partner_id: &prepared.partner,
            endpoint: &prepared.endpoint,
            method: &auth.request.method,
        };

        if let Err(err) = prep {
            labels.outcome = failure_outcome;
            labels.reason = err.reason();
            self.measures.record(&labels);
            tracing::debug!(
                server = %self.server,
                reason = labels.reason,
                error = %err,
                "capability check: unable to derive request labels"
            );
            return self.fail(err.into());
        }

        let values = ParsedValues {
            endpoint: prepared.endpoint.clone(),
            partner: prepared.partner.clone(),
        };

        match self.checker.check_authentication(auth, &values) {
            Ok(()) => {
                self.measures.record(&labels);
                Ok(())
            }
            Err(err) => {
                labels.outcome = failure_outcome;
                labels.reason = reason_of(&*err).unwrap_or(reasons::UNKNOWN);
                self.measures.record(&labels);
                tracing::debug!(
                    server = %self.server,
                    client_id = labels.client_id,
                    endpoint = labels.endpoint,
                    reason = labels.reason,
                    error = %err,
                    "capability check failed"
                );
                let path = auth
                    .request
                    .url
                    .as_ref()
                    .map(|u| u.path().to_owned())
                    .unwrap_or_default();
                self.fail(
                    CheckError::CapabilityCheckFailed {
                        method: auth.request.method.clone(),
                        path,
                        source: err,
                    }
                    .into(),
                )
            }
        }
    }

    fn fail(&self, err: BoxError) -> Result<(), BoxError> {
        if self.error_out {
            tracing::warn!(server = %self.server, error = %err, "request rejected by capability check");
            Err(err)
        } else {
            Ok(())
        }
    }

    /// Gather client id, partner label and endpoint bucket, in that order.
    fn prep_metrics(&self, auth: &Authentication, out: &mut Prepared) -> Result<(), CheckError> {
        let token = auth.token.as_ref().ok_or(CheckError::NoToken)?;
        if auth.request.method.is_empty() {
            return Err(CheckError::NoMethod);
        }
        token.principal().clone_into(&mut out.client);
        let attributes = token.attributes().ok_or(CheckError::NilAttributes)?;

        let partner_val = get_nested_attribute(attributes, &self.partner_keys[..])
            .ok_or_else(|| CheckError::PartnerIdsNotFound {
                keys: self.partner_keys.to_vec(),
            })?;
        let partner_ids =
            as_string_list(partner_val).map_err(|e| CheckError::PartnerIdsNotStringList {
                value: e.value,
            })?;
        out.partner = determine_partner_metric(&partner_ids);

        let url = auth.request.url.as_ref().ok_or(CheckError::NoUrl)?;
        out.endpoint = determine_endpoint_metric(&self.endpoints, url.path());
        Ok(())
    }

    /// The labels the pipeline would compute for `auth`, without recording anything.
    ///
    /// # Errors
    ///
    /// Returns the shape error that would be recorded for this authentication.
    pub fn parsed_values(&self, auth: &Authentication) -> Result<ParsedValues, CheckError> {
        let mut prepared = Prepared::default();
        self.prep_metrics(auth, &mut prepared)?;
        Ok(ParsedValues {
            endpoint: prepared.endpoint,
            partner: prepared.partner,
        })
    }
}

impl fmt::Debug for MetricValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricValidator")
            .field("endpoints", &self.endpoints)
            .field("partner_keys", &self.partner_keys)
            .field("error_out", &self.error_out)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl Validator for MetricValidator {
    /// Reads the authentication from `ctx`; the token argument is not used.
    fn check(&self, ctx: &Extensions, _token: &Token) -> Result<(), BoxError> {
        self.check_authentication(Authentication::from_extensions(ctx))
    }
}
