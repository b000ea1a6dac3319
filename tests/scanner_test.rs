//! Integration tests for the domain scanner and batch scanner

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rsaspnet::{
    AspNetError, AspResult, ArtifactSnapshot, BatchScanner, ConfidenceBand, ConfigManager,
    DomainScanner, Evidence, EvidenceProvider, FetchFailure, Scheme, Signal,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{WEBFORMS_PAGE, domain_of, fast_config, init_tracing, start_stalled_body_server};

async fn mount_webforms_site(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/html; charset=utf-8")
                .insert_header("Server", "Microsoft-IIS/10.0")
                .insert_header("X-AspNet-Version", "4.0.30319")
                .insert_header("X-Powered-By", "ASP.NET")
                .append_header("Set-Cookie", "ASP.NET_SessionId=kx3qzv; path=/; HttpOnly; SameSite=Lax")
                .append_header("Set-Cookie", "theme=dark; expires=Wed, 21 Oct 2026 07:28:00 GMT; path=/")
                .set_body_string(WEBFORMS_PAGE),
        )
        .mount(server)
        .await;
}

struct StaticProvider;

#[async_trait]
impl EvidenceProvider for StaticProvider {
    fn name(&self) -> &str {
        "static-profile"
    }

    async fn collect(&self, _domain: &str, _artifacts: &ArtifactSnapshot) -> AspResult<Vec<Evidence>> {
        Ok(vec![Evidence::new(
            Signal::EnrichmentTechProfile,
            "Technology profile lists ASP.NET",
            "ASP.NET",
            3,
        )])
    }
}

struct FailingProvider;

#[async_trait]
impl EvidenceProvider for FailingProvider {
    fn name(&self) -> &str {
        "broken-provider"
    }

    async fn collect(&self, _domain: &str, _artifacts: &ArtifactSnapshot) -> AspResult<Vec<Evidence>> {
        Err(AspNetError::InvalidInput("upstream quota exhausted".to_string()))
    }
}

struct PanickingProvider;

#[async_trait]
impl EvidenceProvider for PanickingProvider {
    fn name(&self) -> &str {
        "panicking-provider"
    }

    async fn collect(&self, _domain: &str, _artifacts: &ArtifactSnapshot) -> AspResult<Vec<Evidence>> {
        panic!("provider state corrupted")
    }
}

/// collect 正常返回错误，但 name() 会 panic，使 panic 逃出单个扫描
struct UnnamedProvider;

#[async_trait]
impl EvidenceProvider for UnnamedProvider {
    fn name(&self) -> &str {
        panic!("provider has no name")
    }

    async fn collect(&self, _domain: &str, _artifacts: &ArtifactSnapshot) -> AspResult<Vec<Evidence>> {
        Err(AspNetError::InvalidInput("nothing to report".to_string()))
    }
}

#[tokio::test]
async fn test_webforms_site_over_http_fallback() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(1, true)).expect("Failed to create scanner");
    let result = scanner
        .scan_one(&domain_of(&mock_server))
        .await
        .expect("Scan failed");

    assert_eq!(result.scheme, Scheme::Http);
    assert_eq!(result.verdict, Some(true));
    assert_eq!(result.confidence, ConfidenceBand::Certain);
    assert_eq!(result.server_header.as_deref(), Some("Microsoft-IIS/10.0"));
    assert_eq!(result.framework_version.as_deref(), Some("4.0.30319"));
    assert_eq!(result.artifacts.status_code, Some(200));
    assert_eq!(result.artifacts.cookies.len(), 2);

    let signals: Vec<Signal> = result.evidence.iter().map(|e| e.signal).collect();
    assert_eq!(
        signals,
        vec![
            Signal::HeaderVersionMarker,
            Signal::HeaderPoweredBy,
            Signal::HeaderServer,
            Signal::CookieLegacyRuntime,
            Signal::HtmlStateMarker,
            Signal::HtmlResourceHandler,
        ]
    );
    let sum: i32 = result.evidence.iter().map(|e| e.weight).sum();
    assert_eq!(result.score, sum);

    assert!(result.notes.iter().any(|n| n.starts_with("HTTPS request failed")));
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fallback_disabled_never_tries_http() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(1, false)).unwrap();
    let err = scanner
        .scan_one(&domain_of(&mock_server))
        .await
        .unwrap_err();

    match err {
        AspNetError::TerminalFetchFailure {
            scheme, attempts, ..
        } => {
            assert_eq!(scheme, Scheme::Https);
            assert_eq!(attempts, 2);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_both_schemes_failing_surfaces_http_error() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let scanner = DomainScanner::new(fast_config(2, true)).unwrap();
    let err = scanner
        .scan_one(&domain_of(&mock_server))
        .await
        .unwrap_err();

    match err {
        AspNetError::TerminalFetchFailure {
            scheme,
            attempts,
            source,
        } => {
            assert_eq!(scheme, Scheme::Http);
            assert_eq!(attempts, 3);
            assert!(matches!(source, FetchFailure::ServerError(_)));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_invalid_domain_makes_no_request() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(0, true)).unwrap();
    let err = scanner.scan_one("localhost").await.unwrap_err();

    assert!(matches!(err, AspNetError::InvalidInput(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_body_is_capped() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64 * 1024)))
        .mount(&mock_server)
        .await;

    let config = ConfigManager::custom()
        .retry_count(0)
        .retry_backoff_base(Duration::from_millis(10))
        .max_body_bytes(1024)
        .build();
    let scanner = DomainScanner::new(config).unwrap();
    let result = scanner.scan_one(&domain_of(&mock_server)).await.unwrap();

    assert_eq!(result.artifacts.captured_bytes, 1024);
    assert!(result.artifacts.body_truncated);
    assert_eq!(result.artifacts.body_text.as_deref().map(str::len), Some(1024));
    assert!(result.notes.iter().any(|n| n.contains("truncated")));
}

#[tokio::test]
async fn test_enrichment_failure_does_not_fail_scan() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Powered-By", "ASP.NET"))
        .mount(&mock_server)
        .await;

    let scanner = DomainScanner::new(fast_config(0, true))
        .unwrap()
        .with_provider(Arc::new(FailingProvider))
        .with_provider(Arc::new(StaticProvider));
    let result = scanner.scan_one(&domain_of(&mock_server)).await.unwrap();

    // X-Powered-By (3) + 外部技术画像 (3)
    assert_eq!(result.score, 6);
    assert_eq!(result.verdict, None);
    assert_eq!(result.confidence, ConfidenceBand::Medium);
    assert_eq!(
        result.evidence.last().map(|e| e.signal),
        Some(Signal::EnrichmentTechProfile)
    );
    assert!(result.notes.iter().any(|n| n.contains("broken-provider")));
}

#[tokio::test]
async fn test_panicking_provider_does_not_fail_scan() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-Powered-By", "ASP.NET"))
        .mount(&mock_server)
        .await;

    let scanner = DomainScanner::new(fast_config(0, true))
        .unwrap()
        .with_provider(Arc::new(PanickingProvider))
        .with_provider(Arc::new(StaticProvider));
    let result = scanner.scan_one(&domain_of(&mock_server)).await.unwrap();

    assert_eq!(result.score, 6);
    assert_eq!(
        result.evidence.last().map(|e| e.signal),
        Some(Signal::EnrichmentTechProfile)
    );
    assert!(result.notes.iter().any(|n| {
        n.contains("panicking-provider") && n.contains("provider state corrupted")
    }));
}

#[tokio::test]
async fn test_cancel_while_reading_body() {
    init_tracing();
    let addr = start_stalled_body_server().await;

    let scanner = DomainScanner::new(fast_config(0, true)).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = scanner
        .scan_one_with_cancel(&addr.to_string(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, AspNetError::Cancelled), "unexpected error: {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(2), "elapsed {:?}", started.elapsed());
}

#[tokio::test]
async fn test_cancelled_scan_returns_cancelled() {
    init_tracing();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let config = ConfigManager::custom()
        .retry_count(0)
        .per_attempt_timeout(Duration::from_secs(10))
        .build();
    let scanner = DomainScanner::new(config).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = scanner
        .scan_one_with_cancel(&domain_of(&mock_server), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AspNetError::Cancelled));
}

#[tokio::test]
async fn test_batch_collects_failures_separately() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(0, true)).unwrap();
    let batch = BatchScanner::new(scanner);
    let target = domain_of(&mock_server);
    let domains = vec!["localhost".to_string(), target.clone(), "127.0.0.1:1".to_string()];

    let report = batch
        .scan_many(domains, 2, &CancellationToken::new())
        .await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.successes[0].domain, target);
    assert_eq!(report.successes[0].verdict, Some(true));

    let failed: Vec<&str> = report.failures.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(failed, vec!["localhost", "127.0.0.1:1"]);
    assert!(matches!(report.failures[0].1, AspNetError::InvalidInput(_)));
    assert!(matches!(
        report.failures[1].1,
        AspNetError::TerminalFetchFailure { scheme: Scheme::Http, .. }
    ));
}

#[tokio::test]
async fn test_batch_keeps_domain_of_panicked_scan() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(0, true))
        .unwrap()
        .with_provider(Arc::new(UnnamedProvider));
    let target = domain_of(&mock_server);
    let domains = vec![target.clone(), "localhost".to_string()];

    let report = BatchScanner::new(scanner)
        .scan_many(domains, 2, &CancellationToken::new())
        .await;

    assert_eq!(report.total(), 2);
    assert!(report.successes.is_empty());
    let failed: Vec<&str> = report.failures.iter().map(|(d, _)| d.as_str()).collect();
    assert_eq!(failed, vec![target.as_str(), "localhost"]);
    match &report.failures[0].1 {
        AspNetError::TaskPanicked(msg) => assert!(msg.contains("provider has no name")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(matches!(report.failures[1].1, AspNetError::InvalidInput(_)));
}

#[tokio::test]
async fn test_result_serializes_to_json() {
    init_tracing();
    let mock_server = MockServer::start().await;
    mount_webforms_site(&mock_server).await;

    let scanner = DomainScanner::new(fast_config(0, true)).unwrap();
    let result = scanner.scan_one(&domain_of(&mock_server)).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&result.to_compact_json().unwrap()).unwrap();
    assert_eq!(json["scheme"], "http");
    assert_eq!(json["verdict"], true);
    assert_eq!(json["evidence"][0]["signal"], "header_version_marker");
}
