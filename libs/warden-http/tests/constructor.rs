#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the constructor layer
//!
//! These tests verify that:
//! 1. A valid credential reaches the handler with `Authentication` attached
//! 2. Header, scheme and credential failures map to the documented statuses
//! 3. 401 responses carry the `WWW-Authenticate` challenge
//! 4. URL transforms run before the header is inspected

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderValue, Request, StatusCode, header},
    routing::get,
};
use http::request::Parts;
use http_body_util::BodyExt;
use tower::ServiceExt;
use warden_core::{Attributes, Authentication, BoxError, Token};
use warden_http::{
    BasicTokenFactory, ConstructorBuilder, ErrorStatusCoder, TokenFactory,
    legacy_on_error_http_response, remove_prefix_url_fn,
};

const CODEX_CREDENTIAL: &str = "Y29kZXg6Y29kZXg=";

async fn whoami(Extension(auth): Extension<Authentication>) -> String {
    let principal = auth.token.as_ref().map(Token::principal).unwrap_or_default();
    let path = auth.request.url.as_ref().map(|u| u.path().to_owned()).unwrap_or_default();
    format!("{} {} {} {}", auth.authorization, principal, auth.request.method, path)
}

fn basic() -> Arc<BasicTokenFactory> {
    Arc::new([("codex", "codex")].into_iter().collect())
}

/// Custom header, `=` delimiter, `/test` prefix, legacy responses.
fn custom_router() -> Router {
    let layer = ConstructorBuilder::new()
        .header_name("X-Test-Auth")
        .header_delimiter("=")
        .token_factory("Basic", basic())
        .parse_url(remove_prefix_url_fn("/test", None))
        .on_error_http_response(Arc::new(legacy_on_error_http_response))
        .build();
    Router::new().fallback(whoami).layer(layer)
}

/// Empty options keep the defaults.
fn default_router() -> Router {
    let layer = ConstructorBuilder::new()
        .header_name("")
        .header_delimiter("")
        .token_factory("Basic", basic())
        .build();
    Router::new().route("/", get(whoami)).route("/test", get(whoami)).layer(layer)
}

async fn send(router: Router, uri: &str, header: Option<(&str, &str)>) -> (StatusCode, http::HeaderMap, String) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    let response = router.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn valid_credential_reaches_handler() {
    let credential = format!("Basic={CODEX_CREDENTIAL}");
    let (status, _, body) = send(
        custom_router(),
        "/test/devices?x=1",
        Some(("X-Test-Auth", credential.as_str())),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Basic codex GET /devices");
}

#[tokio::test]
async fn missing_prefix_is_forbidden() {
    let (status, headers, _) = send(custom_router(), "/blah", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(headers.get(header::WWW_AUTHENTICATE).is_none());
}

#[tokio::test]
async fn missing_header_is_unauthorized_with_challenge() {
    let (status, headers, _) = send(default_router(), "/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");

    let (status, _, _) = send(default_router(), "/", Some(("Authorization", ""))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn header_without_delimiter_is_bad_request() {
    let (status, _, _) = send(custom_router(), "/test", Some(("X-Test-Auth", "abcd"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // delimiter at index 0 leaves no scheme
    let (status, _, _) = send(default_router(), "/", Some(("Authorization", " abcd"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_utf8_header_is_bad_request() {
    let request = Request::builder()
        .uri("/")
        .header(
            header::AUTHORIZATION,
            HeaderValue::from_bytes(b"Basic \xffabc").unwrap(),
        )
        .body(Body::empty())
        .unwrap();
    let response = default_router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
}

#[tokio::test]
async fn unknown_scheme_is_unauthorized() {
    let (status, headers, _) = send(default_router(), "/test", Some(("Authorization", "abcd "))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn scheme_match_is_case_sensitive() {
    let credential = format!("bAsIc {CODEX_CREDENTIAL}");
    let (status, _, _) = send(default_router(), "/", Some(("Authorization", credential.as_str()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // legacy responses turn an unsupported scheme into 403
    let credential = format!("bAsIc={CODEX_CREDENTIAL}");
    let (status, _, _) = send(custom_router(), "/test", Some(("X-Test-Auth", credential.as_str()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_credential_is_forbidden() {
    let (status, _, _) = send(custom_router(), "/test", Some(("X-Test-Auth", "Basic=AFJDK"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn default_header_and_delimiter_are_used() {
    let credential = format!("Basic {CODEX_CREDENTIAL}");
    let (status, _, body) = send(default_router(), "/", Some(("Authorization", credential.as_str()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Basic codex GET /");
}

struct TeapotFactory;

#[async_trait]
impl TokenFactory for TeapotFactory {
    async fn parse_and_validate(
        &self,
        _parts: &Parts,
        _scheme: &str,
        value: &str,
    ) -> Result<Token, BoxError> {
        if value == "ok" {
            return Ok(Token::new("custom", "someone", Attributes::new()));
        }
        Err(Box::new(ErrorStatusCoder::new("brewing", StatusCode::IM_A_TEAPOT)))
    }
}

#[tokio::test]
async fn factory_error_may_choose_status() {
    let layer = ConstructorBuilder::new()
        .token_factory("Custom", Arc::new(TeapotFactory))
        .build();
    let router = Router::new().route("/", get(whoami)).layer(layer);

    let (status, _, _) = send(router.clone(), "/", Some(("Authorization", "Custom nope"))).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);

    let (status, _, body) = send(router, "/", Some(("Authorization", "Custom ok"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Custom someone GET /");
}
