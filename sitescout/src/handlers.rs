use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use sitescout_core::discover::{DiscoverOptions, execute_discovery};
use sitescout_core::filter::PageFilter;
use sitescout_core::report::{ReportFormat, generate_discovery_summary, render_report, save_report};
use sitescout_scanner::DiscoveryConfig;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use url::Url;

// Helper functions for the discover handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        parse_url_line(url.trim())
            .map(|u| vec![u])
            .ok_or_else(|| format!("Invalid URL '{}'", url))
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding https:// to bare hosts
pub fn parse_url_line(line: &str) -> Option<String> {
    if line.contains("://") {
        if let Ok(url) = Url::parse(line)
            && url.host_str().is_some()
        {
            return Some(line.to_string());
        }
    } else {
        let with_scheme = format!("https://{}", line);
        if let Ok(url) = Url::parse(&with_scheme)
            && url.host_str().is_some()
            && !line.contains(char::is_whitespace)
        {
            return Some(with_scheme);
        }
    }

    eprintln!("{}  Skipping invalid URL '{}'", "!".yellow(), line);
    None
}

/// Map command-line flags onto a discovery configuration
pub fn build_config(args: &ArgMatches) -> DiscoveryConfig {
    let defaults = DiscoveryConfig::default();

    let mut config = defaults
        .clone()
        .with_max_depth(*args.get_one::<usize>("max-depth").unwrap_or(&5))
        .with_concurrency(*args.get_one::<usize>("concurrency").unwrap_or(&8))
        .with_max_child_sitemaps(*args.get_one::<usize>("max-children").unwrap_or(&500))
        .with_timeout(*args.get_one::<u64>("timeout").unwrap_or(&10))
        .with_retries(
            *args.get_one::<u32>("retries").unwrap_or(&2),
            defaults.retry_base_delay,
        )
        .with_feeds(!args.get_flag("no-feeds"))
        .with_llms_txt(args.get_flag("llms-txt"))
        .with_deadline(args.get_one::<u64>("deadline").map(|s| Duration::from_secs(*s)));

    if let Some(user_agent) = args.get_one::<String>("user-agent") {
        config = config.with_user_agent(user_agent.clone());
    }

    config
}

pub fn build_filter(args: &ArgMatches) -> PageFilter {
    PageFilter {
        same_domain: args.get_flag("same-domain"),
        pages_only: args.get_flag("pages-only"),
    }
}

/// Log level for a `-v` count. Logs go to stderr so stdout stays clean for
/// the report.
pub fn verbosity_level(count: u8) -> LevelFilter {
    match count {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init_tracing(count: u8) {
    tracing_subscriber::fmt()
        .with_max_level(verbosity_level(count))
        .with_writer(std::io::stderr)
        .init();
}

/// Expand `~` in a user-supplied output path
pub fn resolve_output_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

pub async fn handle_discover(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<String>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let format_name = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .ok_or_else(|| anyhow!("Unknown report format '{}'", format_name))?;
    let output = sub_matches
        .get_one::<PathBuf>("output")
        .map(|p| resolve_output_path(p));

    let urls = load_urls_from_source(url, hosts_file).map_err(anyhow::Error::msg)?;
    let config = build_config(sub_matches);
    let filter = build_filter(sub_matches);

    if !quiet {
        eprintln!("\n{} Discovering {} site(s)", "→".blue(), urls.len());
        eprintln!(
            "Max depth: {}  Concurrency: {}  Feeds: {}  llms.txt: {}",
            config.max_depth,
            config.concurrency,
            if config.probe_feeds { "on" } else { "off" },
            if config.probe_llms_txt { "on" } else { "off" }
        );
        if let Some(deadline) = config.deadline {
            eprintln!("Deadline: {}s per site", deadline.as_secs());
        }
        eprintln!();
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "\n{} Interrupted, reporting what was found so far",
                "!".yellow().bold()
            );
            ctrl_c_token.cancel();
        }
    });

    let options = DiscoverOptions {
        urls,
        config,
        filter,
        show_progress_bars: !quiet,
    };

    let progress_callback = Arc::new(move |msg: String| {
        if !quiet {
            eprintln!("{}", msg);
        }
    });

    let discoveries = execute_discovery(options, Some(progress_callback), cancel)
        .await
        .map_err(|e| anyhow!("Discovery failed: {}", e))?;

    let report = render_report(&discoveries, format).context("Failed to render report")?;

    match output {
        Some(path) => {
            save_report(&report, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", report),
    }

    if !quiet {
        eprint!("\n{}", generate_discovery_summary(&discoveries));
    }

    Ok(())
}
