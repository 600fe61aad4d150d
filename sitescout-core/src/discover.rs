use crate::filter::PageFilter;
use indicatif::{ProgressBar, ProgressStyle};
use sitescout_scanner::{Discoverer, Discovery, DiscoveryConfig, SourceKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

/// Options for configuring a discovery run
pub struct DiscoverOptions {
    pub urls: Vec<String>,
    pub config: DiscoveryConfig,
    pub filter: PageFilter,
    pub show_progress_bars: bool,
}

/// Callback for reporting per-host progress
pub type DiscoverProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Run discovery against every URL in `options`, one host after another.
///
/// A host that fails is reported through `progress_callback` and skipped.
/// Returns an error only when there was nothing to do or every host failed.
/// Cancelling `cancel` stops the current host and skips the rest; the
/// partial result is still returned.
pub async fn execute_discovery(
    options: DiscoverOptions,
    progress_callback: Option<DiscoverProgressCallback>,
    cancel: CancellationToken,
) -> Result<Vec<Discovery>, String> {
    let DiscoverOptions {
        urls,
        config,
        filter,
        show_progress_bars,
    } = options;

    if urls.is_empty() {
        return Err("No URLs to discover".to_string());
    }

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Starting discovery...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let fetched_count = Arc::new(AtomicUsize::new(0));

    let internal_progress_callback: sitescout_scanner::ProgressCallback = match progress_bar {
        Some(ref pb) => {
            let pb_clone = pb.clone();
            let count_clone = fetched_count.clone();
            Arc::new(move |kind: SourceKind, url: String| {
                let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
                pb_clone.set_message(format!("[{}] {} ({} sources)", kind, url, count));
                pb_clone.tick();
            })
        }
        None => {
            let count_clone = fetched_count.clone();
            Arc::new(move |_kind: SourceKind, _url: String| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            })
        }
    };

    let discoverer = Discoverer::new(config)
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?
        .with_progress_callback(internal_progress_callback)
        .with_cancellation(cancel.clone());

    let mut discoveries = Vec::new();
    let mut failures = Vec::new();

    for (idx, url_str) in urls.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            callback(format!(
                "Discovering host {}/{}: {}",
                idx + 1,
                urls.len(),
                url_str
            ));
        }

        match discoverer.discover(url_str).await {
            Ok(mut discovery) => {
                filter.apply(&mut discovery);
                let stopped = discovery.cancelled;
                discoveries.push(discovery);
                if stopped {
                    break;
                }
            }
            Err(e) => {
                warn!("Discovery of {} failed: {}", url_str, e);
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to discover {}: {}", url_str, e));
                }
                failures.push(format!("{}: {}", url_str, e));
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = fetched_count.load(Ordering::Relaxed);
        let pages: usize = discoveries.iter().map(|d| d.pages.len()).sum();
        pb.finish_with_message(format!(
            "Discovery complete! {} pages from {} sources",
            pages, total
        ));
    }

    if discoveries.is_empty() && !failures.is_empty() {
        return Err(failures.join("; "));
    }

    Ok(discoveries)
}
