//! Router assembly.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Extension, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use prometheus::{Encoder, Registry, TEXT_FORMAT, TextEncoder};
use warden_checks::{AuthCapabilityCheckMeasures, CapabilitiesValidator, MetricValidator, NonEmptyPrincipal};
use warden_core::{Authentication, Validators};
use warden_http::config::BASIC_SCHEME;

use crate::config::ServerConfig;

/// Build the server router.
///
/// `/health` and `/metrics` are public. Everything under `/api` passes the
/// constructor and the enforcer; `Basic` requests additionally run the
/// capability check, which records to `registry`.
///
/// # Errors
///
/// Returns an error if an endpoint pattern or the capability prefix does not
/// compile, or the capability metric is already registered.
pub fn build_router(cfg: &ServerConfig, registry: &Registry) -> anyhow::Result<Router> {
    let check = &cfg.capability_check;
    let measures = AuthCapabilityCheckMeasures::new(registry)
        .context("failed to register capability check metric")?;
    let checker = CapabilitiesValidator::new(Arc::new(check.endpoint_check()?))
        .with_capability_keys(check.capability_keys.clone());
    let metric_validator = MetricValidator::new(Arc::new(checker), Arc::new(measures), &check.server)
        .with_endpoints(check.compile_endpoints()?)
        .with_partner_keys(check.partner_keys.clone())
        .with_error_out(check.error_out);

    tracing::info!(
        server = %metric_validator.server(),
        error_out = metric_validator.error_out(),
        endpoints = check.endpoints.len(),
        "capability check configured"
    );

    let constructor = cfg.auth.constructor().build();
    let enforcer = cfg
        .auth
        .enforcer()
        .rules(
            BASIC_SCHEME,
            Validators::new().with(NonEmptyPrincipal).with(metric_validator),
        )
        .build();

    let protected = Router::new()
        .route("/api", any(whoami))
        .route("/api/{*rest}", any(whoami))
        .layer(enforcer)
        .layer(constructor);

    Ok(Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(metrics))
        .with_state(registry.clone())
        .merge(protected))
}

async fn whoami(Extension(auth): Extension<Authentication>) -> String {
    auth.token
        .map(|t| t.principal().to_owned())
        .unwrap_or_default()
}

async fn metrics(State(registry): State<Registry>) -> Response {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    ([(header::CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response()
}
