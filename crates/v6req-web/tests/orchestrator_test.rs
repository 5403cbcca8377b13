use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use v6req_client::LookupClient;
use v6req_core::{Asn, LookupConfig};
use v6req_web::transport::serve_listener;
use v6req_web::Orchestrator;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(base_url: &str) -> Orchestrator {
    let config = LookupConfig {
        base_url: base_url.to_string(),
        timeout: Duration::from_secs(2),
        max_attempts: 1,
        requests_per_second: 0,
        ..LookupConfig::default()
    };
    Orchestrator::new(Arc::new(LookupClient::new(config).unwrap()))
}

async fn mount_ip(server: &MockServer, ip: &str, asn: u32, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ip/{}", ip)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": { "ip": ip, "prefixes": [ { "asn": { "asn": asn, "name": name, "description": "" } } ] }
        })))
        .mount(server)
        .await;
}

async fn mount_prefixes(server: &MockServer, asn: u32, prefixes: &[&str]) {
    let entries: Vec<_> = prefixes.iter().map(|p| json!({ "prefix": p })).collect();
    Mock::given(method("GET"))
        .and(path(format!("/asn/{}/prefixes", asn)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": { "ipv4_prefixes": [], "ipv6_prefixes": entries }
        })))
        .mount(server)
        .await;
}

async fn mount_details(server: &MockServer, asn: u32, name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/asn/{}", asn)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": { "asn": asn, "name": name, "country_code": "US", "email_contacts": [] }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_prefills_detected_asn() {
    let server = MockServer::start().await;
    mount_ip(&server, "203.0.113.5", 64500, "EXAMPLE-NET").await;

    let page = orchestrator(&server.uri())
        .handle(Some("203.0.113.5".to_string()), None)
        .await;

    assert!(page.auto_detected());
    assert_eq!(page.detected_asn, Some(Asn(64500)));
    assert_eq!(page.asn_name.as_deref(), Some("EXAMPLE-NET"));
    assert_eq!(page.asn, "64500");
    assert!(page.prefixes.is_none());
    assert!(page.error.is_none());
}

#[tokio::test]
async fn test_detection_failure_is_silent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip/203.0.113.5"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let page = orchestrator(&server.uri())
        .handle(Some("203.0.113.5".to_string()), None)
        .await;

    assert!(!page.auto_detected());
    assert_eq!(page.source_ip.as_deref(), Some("203.0.113.5"));
    assert!(page.error.is_none());
    assert!(page.asn.is_empty());
}

#[tokio::test]
async fn test_unparsable_source_ip_skips_detection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let page = orchestrator(&server.uri())
        .handle(Some("unknown".to_string()), None)
        .await;

    assert!(!page.auto_detected());
    assert_eq!(page.source_ip.as_deref(), Some("unknown"));
}

#[tokio::test]
async fn test_post_runs_both_lookups() {
    let server = MockServer::start().await;
    mount_ip(&server, "203.0.113.5", 64500, "EXAMPLE-NET").await;
    mount_prefixes(&server, 64501, &["2001:db8::/32", "2001:db8:8000::/33"]).await;
    mount_details(&server, 64501, "OTHER-NET").await;

    let page = orchestrator(&server.uri())
        .handle(Some("203.0.113.5".to_string()), Some(" AS64501 "))
        .await;

    // The submitted ASN wins over the detected one.
    assert_eq!(page.asn, "AS64501");
    assert_eq!(page.detected_asn, Some(Asn(64500)));
    assert_eq!(
        page.prefixes,
        Some(vec!["2001:db8::/32".to_string(), "2001:db8:8000::/33".to_string()])
    );
    assert_eq!(page.details.as_ref().map(|d| d.name.as_str()), Some("OTHER-NET"));
    assert!(page
        .message
        .as_deref()
        .unwrap()
        .contains("2001:db8::/32, 2001:db8:8000::/33"));
    assert!(page.error.is_none());
}

#[tokio::test]
async fn test_details_failure_is_suppressed() {
    let server = MockServer::start().await;
    mount_prefixes(&server, 64500, &[]).await;
    Mock::given(method("GET"))
        .and(path("/asn/64500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let page = orchestrator(&server.uri()).handle(None, Some("64500")).await;

    assert!(page.details.is_none());
    assert!(page.error.is_none());
    assert_eq!(page.prefixes, Some(Vec::new()));
    assert!(page.message.as_deref().unwrap().contains("no IPv6 associated"));
}

#[tokio::test]
async fn test_prefix_failure_becomes_page_error() {
    let server = MockServer::start().await;
    mount_details(&server, 64500, "EXAMPLE-NET").await;
    Mock::given(method("GET"))
        .and(path("/asn/64500/prefixes"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let page = orchestrator(&server.uri()).handle(None, Some("64500")).await;

    assert_eq!(
        page.error.as_deref(),
        Some("BGPView API rate limit exceeded for ASN 64500. Please try again in a few minutes")
    );
    assert!(page.prefixes.is_none());
    assert!(page.message.is_none());
    assert!(page.details.is_some());
}

#[tokio::test]
async fn test_invalid_asn_makes_no_upstream_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let page = orchestrator(&server.uri())
        .handle(None, Some("64500/../../ip/1.1.1.1"))
        .await;

    assert_eq!(
        page.error.as_deref(),
        Some("Invalid ASN: 64500/../../ip/1.1.1.1")
    );
    assert!(page.prefixes.is_none());
}

#[tokio::test]
async fn test_server_round_trip_and_shutdown() {
    let upstream = MockServer::start().await;
    mount_ip(&upstream, "203.0.113.5", 64500, "EXAMPLE-NET").await;
    mount_prefixes(&upstream, 64500, &["2001:db8::/32"]).await;
    mount_details(&upstream, 64500, "EXAMPLE-NET").await;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_listener(
        listener,
        Arc::new(orchestrator(&upstream.uri())),
        Duration::from_secs(5),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let http = reqwest::Client::new();
    let base = format!("http://{}/", addr);

    let page = http
        .get(&base)
        .header("X-Forwarded-For", "203.0.113.5, 10.0.0.1")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Auto-detected Information"));
    assert!(page.contains("value=\"64500\""));

    let page = http
        .post(&base)
        .header("X-Real-IP", "203.0.113.5")
        .form(&[("asn", "64500")])
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(page.contains("Results for ASN 64500:"));
    assert!(page.contains("<li>2001:db8::/32</li>"));
    assert!(page.contains("AS Organization Details"));

    // Without proxy headers the peer address is used; loopback has no ASN upstream.
    let page = http.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(page.contains("<strong>Your IP:</strong> 127.0.0.1"));

    stop_tx.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_grace_period_closes_slow_requests() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/asn/64500/prefixes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "ok", "data": { "ipv6_prefixes": [] } }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&upstream)
        .await;
    mount_details(&upstream, 64500, "EXAMPLE-NET").await;

    let config = LookupConfig {
        base_url: upstream.uri(),
        timeout: Duration::from_secs(10),
        max_attempts: 1,
        requests_per_second: 0,
        ..LookupConfig::default()
    };
    let orchestrator = Orchestrator::new(Arc::new(LookupClient::new(config).unwrap()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(serve_listener(
        listener,
        Arc::new(orchestrator),
        Duration::from_millis(200),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let started = std::time::Instant::now();
    let request = tokio::spawn(
        reqwest::Client::new()
            .post(format!("http://{}/", addr))
            .form(&[("asn", "64500")])
            .send(),
    );

    // Let the request reach the slow upstream call before stopping.
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_tx.send(()).unwrap();

    server.await.unwrap().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));

    let response = request.await.unwrap();
    assert!(response.is_err(), "slow request should be cut off: {response:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}
