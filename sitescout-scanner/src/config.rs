use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "sitescout/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/trapdoorsec/sitescout)"
);

/// Knobs for a discovery run. Every field has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Deepest sitemap-index nesting that is still expanded. Top-level
    /// sources sit at depth 0.
    pub max_depth: usize,
    /// Fetches in flight at once.
    pub concurrency: usize,
    pub timeout_secs: u64,
    /// Retries for 429, 5xx and transport failures.
    pub retries: u32,
    pub retry_base_delay: Duration,
    pub max_body_bytes: u64,
    /// Children taken from a single sitemap index.
    pub max_child_sitemaps: usize,
    pub probe_feeds: bool,
    pub probe_llms_txt: bool,
    /// Overall time budget; when it runs out the run stops and returns what
    /// it has.
    pub deadline: Option<Duration>,
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            concurrency: 8,
            timeout_secs: 10,
            retries: 2,
            retry_base_delay: Duration::from_millis(500),
            max_body_bytes: 10 * 1024 * 1024,
            max_child_sitemaps: 500,
            probe_feeds: true,
            probe_llms_txt: false,
            deadline: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retries(mut self, retries: u32, base_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: u64) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn with_max_child_sitemaps(mut self, max: usize) -> Self {
        self.max_child_sitemaps = max;
        self
    }

    pub fn with_feeds(mut self, probe_feeds: bool) -> Self {
        self.probe_feeds = probe_feeds;
        self
    }

    pub fn with_llms_txt(mut self, probe_llms_txt: bool) -> Self {
        self.probe_llms_txt = probe_llms_txt;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
