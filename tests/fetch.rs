//! Fetching listing pages over HTTP against a local `wiremock` server.

use std::time::Duration;

use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use brand_facet_extractor::source::{DocumentSource, UrlSource};
use brand_facet_extractor::utils::http::{create_client, RetryPolicy};
use brand_facet_extractor::{Config, Diagnostic, ExtractError, FetchError, Pipeline};

const BRAND_PAGE: &str = r#"<html><script>{"attributeId":"c_brand","values":[{"label":"ACME","hitCount":12}]}</script></html>"#;

fn source(server: &MockServer, max_attempts: u32) -> UrlSource {
    let client = create_client(&Config::default().http).expect("failed to build test client");
    let url = Url::parse(&format!("{}/makeup", server.uri())).expect("invalid mock server URL");
    let policy = RetryPolicy {
        max_attempts,
        backoff_base: Duration::from_millis(10),
    };
    UrlSource::new(client, url, policy)
}

#[tokio::test]
async fn transient_statuses_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BRAND_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let document = source(&server, 3).load().await.expect("fetch should succeed on third attempt");
    let result = Pipeline::default().run(&document).unwrap();

    assert_eq!(result.table().unwrap().get("acme").unwrap().count, 12);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = source(&server, 3).load().await;

    assert!(
        matches!(result, Err(ExtractError::Fetch(FetchError::Status { status: 404, .. }))),
        "expected 404 status error, got: {result:?}"
    );
}

#[tokio::test]
async fn forbidden_is_reported_as_blocked() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let error = source(&server, 3).load().await.unwrap_err();

    assert!(matches!(error, ExtractError::Fetch(FetchError::Blocked { .. })));
    assert!(error.remediation().unwrap().contains(".html"));
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let result = source(&server, 2).load().await;

    match result {
        Err(ExtractError::Fetch(FetchError::RetriesExhausted { attempts, last, .. })) => {
            assert_eq!(attempts, 2);
            assert!(matches!(*last, FetchError::Status { status: 500, .. }));
        }
        other => panic!("expected exhausted retries, got: {other:?}"),
    }
}

#[tokio::test]
async fn content_type_charset_is_used_for_decoding() {
    let server = MockServer::start().await;

    let mut body = br#"<html><script>{"attributeId":"c_brand","values":[{"label":"L'Or"#.to_vec();
    body.push(0xE9);
    body.extend_from_slice(br#"al","hitCount":3}]}</script></html>"#);

    Mock::given(method("GET"))
        .and(path("/makeup"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=iso-8859-1"))
        .mount(&server)
        .await;

    let document = source(&server, 1).load().await.unwrap();
    assert_eq!(document.charset.as_deref(), Some("iso-8859-1"));

    let result = Pipeline::default().run(&document).unwrap();
    assert!(!result
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::DecodedWithFallback { .. })));
    assert_eq!(result.table().unwrap().get("L'Oréal").unwrap().count, 3);
}
