// Tests for multi-host discovery orchestration

use sitescout_core::discover::{DiscoverOptions, execute_discovery, extract_url_path};
use sitescout_core::filter::PageFilter;
use sitescout_scanner::DiscoveryConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quiet_config() -> DiscoveryConfig {
    DiscoveryConfig::default()
        .with_feeds(false)
        .with_timeout(5)
        .with_retries(0, Duration::from_millis(10))
}

fn options(urls: Vec<String>, filter: PageFilter) -> DiscoverOptions {
    DiscoverOptions {
        urls,
        config: quiet_config(),
        filter,
        show_progress_bars: false,
    }
}

async fn site_with_pages(pages: &[&str]) -> MockServer {
    let server = MockServer::start().await;
    let mut xml = String::from("<urlset>");
    for page in pages {
        xml.push_str(&format!("<url><loc>{}{}</loc></url>", server.uri(), page));
    }
    xml.push_str("</urlset>");

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(xml))
        .mount(&server)
        .await;
    server
}

fn closed_port_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

// ============================================================================
// execute_discovery Tests
// ============================================================================

#[tokio::test]
async fn test_execute_discovery_single_host() {
    let server = site_with_pages(&["/a", "/b"]).await;

    let discoveries = execute_discovery(
        options(vec![server.uri()], PageFilter::default()),
        None,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].pages.len(), 2);
}

#[tokio::test]
async fn test_execute_discovery_multiple_hosts_reports_progress() {
    let first = site_with_pages(&["/one"]).await;
    let second = site_with_pages(&["/two"]).await;

    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = messages.clone();

    let discoveries = execute_discovery(
        options(vec![first.uri(), second.uri()], PageFilter::default()),
        Some(Arc::new(move |msg: String| sink.lock().unwrap().push(msg))),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(discoveries.len(), 2);
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].starts_with("Discovering host 1/2"));
}

#[tokio::test]
async fn test_execute_discovery_skips_failed_host() {
    let good = site_with_pages(&["/ok"]).await;

    let discoveries = execute_discovery(
        options(vec![closed_port_uri(), good.uri()], PageFilter::default()),
        None,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(discoveries.len(), 1);
    assert_eq!(discoveries[0].pages.len(), 1);
}

#[tokio::test]
async fn test_execute_discovery_all_hosts_fail() {
    let result = execute_discovery(
        options(vec![closed_port_uri()], PageFilter::default()),
        None,
        CancellationToken::new(),
    )
    .await;

    let err = result.unwrap_err();
    assert!(err.contains("unreachable"), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_execute_discovery_no_urls() {
    let result = execute_discovery(
        options(Vec::new(), PageFilter::default()),
        None,
        CancellationToken::new(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_execute_discovery_applies_filter() {
    let server = site_with_pages(&["/post", "/logo.png", "/styles/site.css"]).await;

    let filter = PageFilter {
        same_domain: true,
        pages_only: true,
    };
    let discoveries = execute_discovery(
        options(vec![server.uri()], filter),
        None,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(
        discoveries[0].urls(),
        vec![format!("{}/post", server.uri())]
    );
}

#[tokio::test]
async fn test_execute_discovery_cancelled_before_start() {
    let server = site_with_pages(&["/a"]).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let discoveries = execute_discovery(
        options(vec![server.uri()], PageFilter::default()),
        None,
        cancel,
    )
    .await
    .unwrap();

    assert!(discoveries.is_empty());
}

// ============================================================================
// URL Path Extraction Tests
// ============================================================================

#[test]
fn test_extract_url_path_root() {
    assert_eq!(extract_url_path("http://example.com/"), "/");
    assert_eq!(extract_url_path("http://example.com"), "/");
}

#[test]
fn test_extract_url_path_nested() {
    let path = extract_url_path("https://example.com/blog/2024/post");
    assert_eq!(path, "/blog/2024/post");
}

#[test]
fn test_extract_url_path_drops_query_and_fragment() {
    let path = extract_url_path("http://example.com/sitemap.xml?page=2#top");
    assert_eq!(path, "/sitemap.xml");
}

#[test]
fn test_extract_url_path_with_port() {
    let path = extract_url_path("http://localhost:3000/feed.xml");
    assert_eq!(path, "/feed.xml");
}

#[test]
fn test_extract_url_path_invalid_url() {
    let url = "not a valid url";
    // Invalid URLs come back unchanged
    assert_eq!(extract_url_path(url), url);
}
