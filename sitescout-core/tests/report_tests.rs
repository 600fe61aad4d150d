// Tests for report generation functionality

use chrono::{TimeZone, Utc};
use sitescout_core::report::{
    ReportFormat, generate_csv_report, generate_discovery_summary, generate_json_report,
    generate_markdown_report, generate_text_report, merged_urls, render_report, save_report,
};
use sitescout_scanner::{
    Diagnostic, DiscoveredSource, Discovery, FetchOutcome, PageUrl, SourceKind,
};
use std::time::Duration;
use tempfile::TempDir;

fn sample_discovery(base: &str, pages: &[&str]) -> Discovery {
    let sitemap = format!("{}sitemap.xml", base);

    let mut source = DiscoveredSource::new(sitemap.clone(), SourceKind::Sitemap, 0);
    source.fetched = true;
    source.pages_found = pages.len();

    let mut discovery = Discovery::new(base.to_string());
    discovery.sources.push(source);
    discovery.pages = pages
        .iter()
        .map(|url| PageUrl {
            url: url.to_string(),
            discovered_from: sitemap.clone(),
            lastmod: None,
        })
        .collect();
    discovery.diagnostics.push(Diagnostic {
        url: format!("{}feed.xml", base),
        kind: SourceKind::Feed,
        outcome: FetchOutcome::HttpStatus(503),
    });
    discovery.elapsed = Duration::from_millis(1500);
    discovery
}

fn two_hosts() -> Vec<Discovery> {
    vec![
        sample_discovery(
            "https://b.example/",
            &["https://b.example/zeta", "https://shared.example/x"],
        ),
        sample_discovery(
            "https://a.example/",
            &["https://a.example/alpha", "https://shared.example/x"],
        ),
    ]
}

// ============================================================================
// Report Format Tests
// ============================================================================

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("txt"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("json"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), Some(ReportFormat::Csv));
    assert_eq!(ReportFormat::from_str("markdown"), Some(ReportFormat::Markdown));
    assert_eq!(ReportFormat::from_str("md"), Some(ReportFormat::Markdown));
}

#[test]
fn test_report_format_from_str_case_insensitive() {
    assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("Csv"), Some(ReportFormat::Csv));
}

#[test]
fn test_report_format_from_str_invalid() {
    assert!(ReportFormat::from_str("html").is_none());
    assert!(ReportFormat::from_str("").is_none());
}

// ============================================================================
// Rendering Tests
// ============================================================================

#[test]
fn test_merged_urls_first_seen_order() {
    assert_eq!(
        merged_urls(&two_hosts()),
        vec![
            "https://b.example/zeta",
            "https://shared.example/x",
            "https://a.example/alpha",
        ]
    );
}

#[test]
fn test_text_report_one_url_per_line() {
    let report = generate_text_report(&two_hosts());
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "https://b.example/zeta");
}

#[test]
fn test_text_report_empty() {
    assert_eq!(generate_text_report(&[]), "");
}

#[test]
fn test_json_report_shape() {
    let report = generate_json_report(&two_hosts()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();

    let urls: Vec<&str> = value["urls"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://a.example/alpha",
            "https://b.example/zeta",
            "https://shared.example/x",
        ]
    );

    let hosts = value["hosts"].as_array().unwrap();
    assert_eq!(hosts.len(), 2);
    assert_eq!(hosts[0]["base_url"], "https://b.example/");
    assert_eq!(hosts[0]["sources"][0]["kind"], "sitemap");
    assert_eq!(hosts[0]["diagnostics"][0]["outcome"]["type"], "http-status");
    assert_eq!(value["generator"], "sitescout");
}

#[test]
fn test_csv_report() {
    let mut discoveries = two_hosts();
    discoveries[0].pages[0].lastmod = Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    discoveries[0].pages[1].url = "https://b.example/q?a=1,2".to_string();

    let report = generate_csv_report(&discoveries);
    let lines: Vec<&str> = report.lines().collect();

    assert_eq!(lines[0], "url,source,source_kind,lastmod,base_url");
    assert_eq!(
        lines[1],
        "https://b.example/zeta,https://b.example/sitemap.xml,sitemap,2024-01-15T00:00:00+00:00,https://b.example/"
    );
    assert!(lines[2].starts_with("\"https://b.example/q?a=1,2\","));
    assert_eq!(lines.len(), 5);
}

#[test]
fn test_markdown_report() {
    let report = generate_markdown_report(&two_hosts());
    assert!(report.starts_with("# Site URL Discovery Report"));
    assert!(report.contains("## https://a.example/"));
    assert!(report.contains("| sitemap | https://a.example/sitemap.xml | 0 | 2 |"));
    assert!(report.contains("HTTP 503"));
    assert!(report.contains("- <https://a.example/alpha>"));
}

#[test]
fn test_markdown_report_marks_partial() {
    let mut discoveries = two_hosts();
    discoveries[1].cancelled = true;
    let report = generate_markdown_report(&discoveries);
    assert!(report.contains("results are partial"));
}

#[test]
fn test_render_report_dispatch() {
    let discoveries = two_hosts();
    let text = render_report(&discoveries, ReportFormat::Text).unwrap();
    assert_eq!(text, generate_text_report(&discoveries));

    let json = render_report(&discoveries, ReportFormat::Json).unwrap();
    assert!(json.trim_start().starts_with('{'));
}

#[test]
fn test_discovery_summary() {
    colored::control::set_override(false);

    let summary = generate_discovery_summary(&two_hosts());
    assert!(summary.contains("Hosts: 2"));
    assert!(summary.contains("Unique pages: 3"));
    assert!(summary.contains("Sources fetched: 2"));
    assert!(summary.contains("/sitemap.xml 2 pages"));
    assert!(summary.contains("HTTP 503"));
}

// ============================================================================
// Save Tests
// ============================================================================

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("urls.txt");

    let content = generate_text_report(&two_hosts());
    save_report(&content, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, content);
}

#[test]
fn test_save_report_missing_directory() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("urls.txt");
    assert!(save_report("x", &path).is_err());
}
