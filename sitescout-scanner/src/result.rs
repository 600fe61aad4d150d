use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What kind of URL list a source turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Sitemap,
    SitemapIndex,
    Feed,
    Robots,
    LlmsTxt,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Sitemap => "sitemap",
            SourceKind::SitemapIndex => "sitemap-index",
            SourceKind::Feed => "feed",
            SourceKind::Robots => "robots",
            SourceKind::LlmsTxt => "llms-txt",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL known (or suspected) to host a list of page URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredSource {
    pub url: String,
    pub kind: SourceKind,
    pub fetched: bool,
    pub depth: usize,
    pub pages_found: usize,
}

impl DiscoveredSource {
    pub fn new(url: String, kind: SourceKind, depth: usize) -> Self {
        Self {
            url,
            kind,
            fetched: false,
            depth,
            pages_found: 0,
        }
    }
}

/// A single canonical page URL and the source that yielded it.
///
/// `discovered_from` is the source URL as a plain string; it records provenance
/// only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageUrl {
    pub url: String,
    pub discovered_from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<DateTime<Utc>>,
}

/// Why a source contributed nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "kebab-case")]
pub enum FetchOutcome {
    /// 404 or 410: the resource simply isn't there.
    Absent(u16),
    HttpStatus(u16),
    Transport(String),
    Parse(String),
    TooLarge(u64),
    RecursionLimit(usize),
    Cancelled,
}

impl FetchOutcome {
    /// True when the server answered at all, absent or not.
    pub fn got_response(&self) -> bool {
        !matches!(self, FetchOutcome::Transport(_) | FetchOutcome::Cancelled)
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Absent(status) => write!(f, "not found ({})", status),
            FetchOutcome::HttpStatus(status) => write!(f, "HTTP {}", status),
            FetchOutcome::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchOutcome::Parse(msg) => write!(f, "parse error: {}", msg),
            FetchOutcome::TooLarge(bytes) => write!(f, "body too large ({} bytes)", bytes),
            FetchOutcome::RecursionLimit(depth) => {
                write!(f, "sitemap index nesting exceeds depth {}", depth)
            }
            FetchOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub url: String,
    pub kind: SourceKind,
    pub outcome: FetchOutcome,
}

/// Everything one discovery run produced for a single base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discovery {
    pub base_url: String,
    pub pages: Vec<PageUrl>,
    pub sources: Vec<DiscoveredSource>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl Discovery {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            pages: Vec::new(),
            sources: Vec::new(),
            diagnostics: Vec::new(),
            cancelled: false,
            elapsed: Duration::from_secs(0),
        }
    }

    pub fn urls(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.url.as_str()).collect()
    }

    /// Sources that were fetched and yielded a usable document.
    pub fn fetched_sources(&self) -> impl Iterator<Item = &DiscoveredSource> {
        self.sources.iter().filter(|s| s.fetched)
    }
}
