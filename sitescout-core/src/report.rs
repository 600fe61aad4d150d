// Report generation from discovery results

use crate::discover::extract_url_path;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use sitescout_scanner::{Discovery, FetchOutcome, SourceKind};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Page URLs across all hosts, deduplicated, in first-seen order.
pub fn merged_urls(discoveries: &[Discovery]) -> Vec<String> {
    let mut seen = HashSet::new();
    discoveries
        .iter()
        .flat_map(|d| d.pages.iter())
        .filter(|p| seen.insert(p.url.as_str()))
        .map(|p| p.url.clone())
        .collect()
}

pub fn render_report(
    discoveries: &[Discovery],
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(discoveries)),
        ReportFormat::Json => generate_json_report(discoveries),
        ReportFormat::Csv => Ok(generate_csv_report(discoveries)),
        ReportFormat::Markdown => Ok(generate_markdown_report(discoveries)),
    }
}

/// One URL per line, suitable for piping.
pub fn generate_text_report(discoveries: &[Discovery]) -> String {
    let mut report = String::new();
    for url in merged_urls(discoveries) {
        report.push_str(&url);
        report.push('\n');
    }
    report
}

pub fn generate_json_report(discoveries: &[Discovery]) -> Result<String, serde_json::Error> {
    let union: BTreeSet<&str> = discoveries
        .iter()
        .flat_map(|d| d.pages.iter().map(|p| p.url.as_str()))
        .collect();

    let hosts: Vec<serde_json::Value> = discoveries
        .iter()
        .map(|d| {
            serde_json::json!({
                "base_url": d.base_url,
                "cancelled": d.cancelled,
                "elapsed_seconds": d.elapsed.as_secs_f64(),
                "pages": d.pages,
                "sources": d.sources,
                "diagnostics": d.diagnostics,
            })
        })
        .collect();

    let json_report = serde_json::json!({
        "generator": "sitescout",
        "version": env!("CARGO_PKG_VERSION"),
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "urls": union,
        "hosts": hosts,
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_csv_report(discoveries: &[Discovery]) -> String {
    let mut report = String::from("url,source,source_kind,lastmod,base_url\n");

    for discovery in discoveries {
        let kinds: HashMap<&str, SourceKind> = discovery
            .sources
            .iter()
            .map(|s| (s.url.as_str(), s.kind))
            .collect();

        for page in &discovery.pages {
            let kind = kinds
                .get(page.discovered_from.as_str())
                .map(|k| k.as_str())
                .unwrap_or_default();
            let lastmod = page.lastmod.map(|d| d.to_rfc3339()).unwrap_or_default();

            report.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_field(&page.url),
                csv_field(&page.discovered_from),
                kind,
                lastmod,
                csv_field(&discovery.base_url)
            ));
        }
    }

    report
}

pub fn generate_markdown_report(discoveries: &[Discovery]) -> String {
    let mut report = String::new();
    report.push_str("# Site URL Discovery Report\n\n");
    report.push_str(&format!(
        "Generated {} by sitescout {}\n\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        env!("CARGO_PKG_VERSION")
    ));

    for discovery in discoveries {
        report.push_str(&format!("## {}\n\n", discovery.base_url));
        report.push_str(&format!("- Pages: {}\n", discovery.pages.len()));
        report.push_str(&format!(
            "- Sources fetched: {} of {}\n",
            discovery.fetched_sources().count(),
            discovery.sources.len()
        ));
        if discovery.cancelled {
            report.push_str("- **Stopped early; results are partial**\n");
        }
        report.push('\n');

        if !discovery.sources.is_empty() {
            report.push_str("### Sources\n\n");
            report.push_str("| Kind | URL | Depth | Pages |\n");
            report.push_str("|------|-----|-------|-------|\n");
            for source in discovery.fetched_sources() {
                report.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    source.kind, source.url, source.depth, source.pages_found
                ));
            }
            report.push('\n');
        }

        let problems: Vec<_> = discovery
            .diagnostics
            .iter()
            .filter(|d| !matches!(d.outcome, FetchOutcome::Absent(_)))
            .collect();
        if !problems.is_empty() {
            report.push_str("### Problems\n\n");
            for diagnostic in problems {
                report.push_str(&format!(
                    "- `{}` ({}): {}\n",
                    diagnostic.url, diagnostic.kind, diagnostic.outcome
                ));
            }
            report.push('\n');
        }

        if !discovery.pages.is_empty() {
            report.push_str("### Pages\n\n");
            for page in &discovery.pages {
                report.push_str(&format!("- <{}>\n", page.url));
            }
            report.push('\n');
        }
    }

    report
}

/// Human-readable run summary for the terminal.
pub fn generate_discovery_summary(discoveries: &[Discovery]) -> String {
    let mut report = String::new();
    report.push_str(RULE);
    report.push_str("\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Hosts: {}\n", discoveries.len()));
    report.push_str(&format!(
        "  Unique pages: {}\n",
        merged_urls(discoveries).len()
    ));
    let fetched: usize = discoveries.iter().map(|d| d.fetched_sources().count()).sum();
    report.push_str(&format!("  Sources fetched: {}\n", fetched));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    for discovery in discoveries {
        report.push_str(&format!("## {}\n", discovery.base_url.bold()));
        report.push_str(&format!(
            "  {} pages in {:.2}s",
            discovery.pages.len(),
            discovery.elapsed.as_secs_f64()
        ));
        if discovery.cancelled {
            report.push_str(&format!(" {}", "(stopped early)".yellow()));
        }
        report.push_str("\n\n");

        for source in discovery.fetched_sources() {
            report.push_str(&format!(
                "  {} {} {}\n",
                format!("{:>13}", source.kind.as_str()).green(),
                extract_url_path(&source.url),
                format!("{} pages", source.pages_found).bright_black()
            ));
        }

        for diagnostic in &discovery.diagnostics {
            let label = format!("{:>13}", diagnostic.kind.as_str());
            let line = match diagnostic.outcome {
                FetchOutcome::Absent(_) => continue,
                FetchOutcome::RecursionLimit(_) | FetchOutcome::Cancelled => label.yellow(),
                _ => label.red(),
            };
            report.push_str(&format!(
                "  {} {} {}\n",
                line,
                extract_url_path(&diagnostic.url),
                diagnostic.outcome.to_string().bright_black()
            ));
        }
        report.push('\n');
    }

    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
