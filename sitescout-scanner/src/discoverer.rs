use crate::canonical;
use crate::config::DiscoveryConfig;
use crate::error::{Result, ScanError};
use crate::feed;
use crate::fetch::{Fetched, Fetcher};
use crate::llms;
use crate::result::{Diagnostic, DiscoveredSource, Discovery, FetchOutcome, PageUrl, SourceKind};
use crate::robots;
use crate::sitemap::{self, SitemapDocument, SitemapEntry};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(SourceKind, String) + Send + Sync>;

const WELL_KNOWN_SITEMAPS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Finds the page URLs a site publishes through robots.txt, sitemaps,
/// feeds and llms.txt.
pub struct Discoverer {
    fetcher: Fetcher,
    config: DiscoveryConfig,
    progress_callback: Option<ProgressCallback>,
    cancel: CancellationToken,
}

/// A source waiting to be fetched. `index` points into `Discovery::sources`.
struct Pending {
    url: Url,
    kind: SourceKind,
    depth: usize,
    index: usize,
}

/// Mutable state of a single run. Only the merge loop touches it.
struct RunState {
    discovery: Discovery,
    visited: HashSet<String>,
    seen_pages: HashSet<String>,
    settled: HashSet<usize>,
    responses: usize,
    transport_failures: usize,
}

impl RunState {
    fn new(base_url: String) -> Self {
        Self {
            discovery: Discovery::new(base_url),
            visited: HashSet::new(),
            seen_pages: HashSet::new(),
            settled: HashSet::new(),
            responses: 0,
            transport_failures: 0,
        }
    }

    /// Register a source unless its canonical URL has been seen already.
    fn enqueue(&mut self, url: Url, kind: SourceKind, depth: usize) -> Option<Pending> {
        let key = canonical::canonicalize_url(url.clone())?;
        if !self.visited.insert(key) {
            debug!("Skipping already-seen source {}", url);
            return None;
        }

        let index = self.discovery.sources.len();
        self.discovery
            .sources
            .push(DiscoveredSource::new(url.to_string(), kind, depth));

        Some(Pending {
            url,
            kind,
            depth,
            index,
        })
    }

    fn add_pages(
        &mut self,
        index: usize,
        pages: impl IntoIterator<Item = (String, Option<DateTime<Utc>>)>,
    ) {
        let from = self.discovery.sources[index].url.clone();
        let mut found = 0;

        for (url, lastmod) in pages {
            found += 1;
            if self.seen_pages.insert(url.clone()) {
                self.discovery.pages.push(PageUrl {
                    url,
                    discovered_from: from.clone(),
                    lastmod,
                });
            }
        }

        self.discovery.sources[index].pages_found += found;
    }

    fn count_response(&mut self, outcome: &FetchOutcome) {
        if outcome.got_response() {
            self.responses += 1;
        } else if matches!(outcome, FetchOutcome::Transport(_)) {
            self.transport_failures += 1;
        }
    }

    fn fail(&mut self, url: &str, kind: SourceKind, outcome: FetchOutcome) {
        self.count_response(&outcome);
        self.diagnose(url, kind, outcome);
    }

    fn diagnose(&mut self, url: &str, kind: SourceKind, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Absent(_) => debug!("{} {}: {}", kind, url, outcome),
            _ => warn!("{} {}: {}", kind, url, outcome),
        }
        self.discovery.diagnostics.push(Diagnostic {
            url: url.to_string(),
            kind,
            outcome,
        });
    }
}

impl Discoverer {
    pub fn new(config: DiscoveryConfig) -> Result<Self> {
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            fetcher,
            config,
            progress_callback: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Stop the run when `token` is cancelled. Whatever was merged so far is
    /// returned with `cancelled` set.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Discover every page URL the site at `base` publishes.
    ///
    /// Fails only for an unusable base URL or when no probe got any HTTP
    /// response at all. Missing or broken sources end up in
    /// `Discovery::diagnostics`.
    pub async fn discover(&self, base: &str) -> Result<Discovery> {
        let start = Instant::now();
        let base_url = canonical::normalize_base(base)?;
        let deadline = self
            .config
            .deadline
            .map(|d| tokio::time::Instant::now() + d);

        info!("Starting discovery of {}", base_url);

        let mut state = RunState::new(base_url.to_string());

        let wave = self.seed(&base_url, &mut state, deadline).await?;
        if !state.discovery.cancelled {
            self.traverse(wave, &mut state, deadline).await;
        }

        if state.discovery.cancelled {
            warn!("Discovery of {} stopped early", base_url);
            let unsettled: Vec<(String, SourceKind)> = state
                .discovery
                .sources
                .iter()
                .enumerate()
                .filter(|(i, _)| !state.settled.contains(i))
                .map(|(_, s)| (s.url.clone(), s.kind))
                .collect();
            for (url, kind) in unsettled {
                state.diagnose(&url, kind, FetchOutcome::Cancelled);
            }
        } else if state.responses == 0 && state.transport_failures > 0 {
            return Err(ScanError::DomainUnreachable {
                domain: base_url.host_str().unwrap_or_default().to_string(),
                attempts: state.transport_failures,
            });
        }

        let mut discovery = state.discovery;
        discovery.elapsed = start.elapsed();

        info!(
            "Discovery of {} complete: {} pages from {} sources in {:.2}s",
            base_url,
            discovery.pages.len(),
            discovery.fetched_sources().count(),
            discovery.elapsed.as_secs_f64()
        );

        Ok(discovery)
    }

    /// Fetch robots.txt (and the home page when feeds are on) and build the
    /// first wave of sources.
    async fn seed(
        &self,
        base: &Url,
        state: &mut RunState,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<Vec<Pending>> {
        let robots_url = base.join("/robots.txt")?;
        let robots_source = state.enqueue(robots_url.clone(), SourceKind::Robots, 0);
        self.report_progress(SourceKind::Robots, &robots_url);

        let home = async {
            if self.config.probe_feeds {
                Some(self.fetcher.get(base).await)
            } else {
                None
            }
        };
        let preflight = async { tokio::join!(self.fetcher.get(&robots_url), home) };

        let (robots, home) = tokio::select! {
            biased;
            _ = halted(&self.cancel, deadline) => {
                state.discovery.cancelled = true;
                return Ok(Vec::new());
            }
            results = preflight => results,
        };

        let mut wave = Vec::new();

        if let Some(source) = robots_source {
            state.settled.insert(source.index);
            match robots {
                Ok(fetched) => {
                    state.responses += 1;
                    state.discovery.sources[source.index].fetched = true;

                    let listed = robots::parse_sitemap_directives(&fetched.body, &fetched.url);
                    debug!("robots.txt lists {} sitemaps", listed.len());

                    for sitemap_url in listed {
                        if let Ok(url) = Url::parse(&sitemap_url)
                            && let Some(pending) = state.enqueue(url, SourceKind::Sitemap, 0)
                        {
                            wave.push(pending);
                        }
                    }
                }
                Err(outcome) => state.fail(robots_url.as_str(), SourceKind::Robots, outcome),
            }
        }

        for path in WELL_KNOWN_SITEMAPS {
            let url = base.join(path)?;
            wave.extend(state.enqueue(url, SourceKind::Sitemap, 0));
        }

        if let Some(home) = home {
            match home {
                Ok(page) => {
                    state.responses += 1;
                    for feed_url in feed::extract_feed_links(&page.body, &page.url) {
                        if let Ok(url) = Url::parse(&feed_url) {
                            wave.extend(state.enqueue(url, SourceKind::Feed, 0));
                        }
                    }
                }
                Err(outcome) => {
                    debug!("Home page {} not usable for feed autodiscovery: {}", base, outcome);
                    state.count_response(&outcome);
                }
            }

            for path in feed::COMMON_FEED_PATHS {
                let url = base.join(path)?;
                wave.extend(state.enqueue(url, SourceKind::Feed, 0));
            }
        }

        if self.config.probe_llms_txt {
            let url = base.join("/llms.txt")?;
            wave.extend(state.enqueue(url, SourceKind::LlmsTxt, 0));
        }

        Ok(wave)
    }

    /// Fetch sources wave by wave until no new ones turn up.
    ///
    /// Within a wave fetches run concurrently but results are merged in
    /// submission order, so the same site always yields the same ordering.
    /// A wave finishes before the next starts: children of a fast index
    /// wait for the slowest source of their parent's wave.
    async fn traverse(
        &self,
        mut wave: Vec<Pending>,
        state: &mut RunState,
        deadline: Option<tokio::time::Instant>,
    ) {
        while !wave.is_empty() {
            debug!("Fetching wave of {} sources", wave.len());

            let fetcher = &self.fetcher;
            let results = stream::iter(std::mem::take(&mut wave))
                .map(|task| {
                    self.report_progress(task.kind, &task.url);
                    async move {
                        let outcome = fetcher.get(&task.url).await;
                        (task, outcome)
                    }
                })
                .buffered(self.config.concurrency.max(1));
            tokio::pin!(results);

            let mut next_wave = Vec::new();
            loop {
                tokio::select! {
                    biased;
                    _ = halted(&self.cancel, deadline) => {
                        state.discovery.cancelled = true;
                        return;
                    }
                    item = results.next() => match item {
                        Some((task, outcome)) => {
                            next_wave.extend(self.absorb(task, outcome, state));
                        }
                        None => break,
                    }
                }
            }

            wave = next_wave;
        }
    }

    /// Merge one fetch result into the run, returning any child sitemaps.
    fn absorb(
        &self,
        task: Pending,
        outcome: std::result::Result<Fetched, FetchOutcome>,
        state: &mut RunState,
    ) -> Vec<Pending> {
        state.settled.insert(task.index);

        let fetched = match outcome {
            Ok(fetched) => {
                state.responses += 1;
                fetched
            }
            Err(outcome) => {
                state.fail(task.url.as_str(), task.kind, outcome);
                return Vec::new();
            }
        };

        match self.classify(&task, &fetched, state) {
            Ok(children) => {
                state.discovery.sources[task.index].fetched = true;
                children
            }
            Err(e) => {
                let message = match e {
                    ScanError::ParseError(msg) => msg,
                    other => other.to_string(),
                };
                state.diagnose(task.url.as_str(), task.kind, FetchOutcome::Parse(message));
                Vec::new()
            }
        }
    }

    /// Decide what a fetched body is by its content and harvest it.
    fn classify(&self, task: &Pending, fetched: &Fetched, state: &mut RunState) -> Result<Vec<Pending>> {
        let body = fetched.body.as_str();

        if task.kind == SourceKind::LlmsTxt {
            let links = llms::parse_llms_txt(body, &fetched.url);
            state.add_pages(task.index, links.into_iter().map(|url| (url, None)));
            return Ok(Vec::new());
        }

        if !sitemap::looks_like_xml(body) {
            if served_as_html(fetched) {
                return Err(ScanError::ParseError(
                    "HTML page, not a sitemap or feed".to_string(),
                ));
            }
            if task.kind == SourceKind::Feed {
                return Err(ScanError::ParseError("not a feed (body is not XML)".to_string()));
            }

            let urls = sitemap::parse_text_sitemap(body);
            if urls.is_empty() && !body.trim().is_empty() {
                return Err(ScanError::ParseError(
                    "not a sitemap (neither XML nor a URL list)".to_string(),
                ));
            }
            state.add_pages(task.index, urls.into_iter().map(|url| (url, None)));
            return Ok(Vec::new());
        }

        let root = sitemap::sniff_root(body)?.unwrap_or_default();
        match root.as_str() {
            "urlset" | "sitemapindex" => match sitemap::parse_sitemap_document(body)? {
                SitemapDocument::UrlSet(entries) => {
                    let pages: Vec<_> = entries
                        .into_iter()
                        .filter_map(|entry| {
                            canonical::resolve(&fetched.url, &entry.loc).map(|url| (url, entry.lastmod))
                        })
                        .collect();
                    state.add_pages(task.index, pages);
                    Ok(Vec::new())
                }
                SitemapDocument::Index(entries) => {
                    state.discovery.sources[task.index].kind = SourceKind::SitemapIndex;
                    Ok(self.expand_index(task, &fetched.url, entries, state))
                }
            },
            root if feed::is_feed_root(root) => {
                let items = feed::parse_feed(body)?;
                state.discovery.sources[task.index].kind = SourceKind::Feed;
                let pages: Vec<_> = items
                    .into_iter()
                    .filter_map(|item| {
                        canonical::resolve(&fetched.url, &item.link).map(|url| (url, item.updated))
                    })
                    .collect();
                state.add_pages(task.index, pages);
                Ok(Vec::new())
            }
            "" => Err(ScanError::ParseError("empty document".to_string())),
            other => Err(ScanError::ParseError(format!(
                "unrecognized document (root element <{}>)",
                other
            ))),
        }
    }

    fn expand_index(
        &self,
        task: &Pending,
        index_url: &Url,
        entries: Vec<SitemapEntry>,
        state: &mut RunState,
    ) -> Vec<Pending> {
        let child_depth = task.depth + 1;
        let limit = self.config.max_child_sitemaps;

        if entries.len() > limit {
            warn!(
                "Sitemap index {} lists {} children, following the first {}",
                task.url,
                entries.len(),
                limit
            );
        }

        let mut children = Vec::new();
        for entry in entries.into_iter().take(limit) {
            let Ok(child_url) = index_url.join(entry.loc.trim()) else {
                debug!("Skipping unparseable child sitemap {:?}", entry.loc);
                continue;
            };
            let Some(key) = canonical::canonicalize_url(child_url.clone()) else {
                continue;
            };

            if child_depth > self.config.max_depth {
                if state.visited.insert(key) {
                    state.diagnose(
                        child_url.as_str(),
                        SourceKind::Sitemap,
                        FetchOutcome::RecursionLimit(self.config.max_depth),
                    );
                }
                continue;
            }

            children.extend(state.enqueue(child_url, SourceKind::Sitemap, child_depth));
        }

        debug!("Sitemap index {} queued {} children", task.url, children.len());
        children
    }

    fn report_progress(&self, kind: SourceKind, url: &Url) {
        if let Some(ref callback) = self.progress_callback {
            callback(kind, url.to_string());
        }
    }
}

fn served_as_html(fetched: &Fetched) -> bool {
    fetched.content_type.as_deref().is_some_and(|ct| {
        let mime = ct.split(';').next().unwrap_or_default().trim();
        mime.eq_ignore_ascii_case("text/html") || mime.eq_ignore_ascii_case("application/xhtml+xml")
    })
}

/// Resolves once the run should stop: on cancellation or when the deadline
/// passes.
async fn halted(cancel: &CancellationToken, deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep_until(at) => {}
            }
        }
        None => cancel.cancelled().await,
    }
}
