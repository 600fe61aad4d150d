use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::result::FetchOutcome;
use flate2::read::GzDecoder;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use std::io::Read;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Longest single wait between retries, whatever the server asks for.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Leading bytes of a gzip stream, as served by `sitemap.xml.gz` files.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A successfully fetched document.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Final URL after redirects; relative links resolve against this.
    pub url: Url,
    pub content_type: Option<String>,
    pub body: String,
}

/// GET with retries and a body size cap.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    retries: u32,
    base_delay: Duration,
    max_body_bytes: u64,
}

impl Fetcher {
    pub fn new(config: &DiscoveryConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .connect_timeout(timeout / 2)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            retries: config.retries,
            base_delay: config.retry_base_delay,
            max_body_bytes: config.max_body_bytes,
        })
    }

    /// Fetch `url`. Every failure mode is an ordinary [`FetchOutcome`]; 404 and
    /// 410 come back as [`FetchOutcome::Absent`].
    pub async fn get(&self, url: &Url) -> std::result::Result<Fetched, FetchOutcome> {
        let mut attempt = 0;

        loop {
            debug!("Fetching {} (attempt {})", url, attempt + 1);

            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.read_body(response).await;
                    }

                    if is_retryable(status) && attempt < self.retries {
                        let wait = retry_after(&response)
                            .unwrap_or_else(|| self.backoff(attempt))
                            .min(MAX_BACKOFF);
                        debug!("{} returned {}, retrying in {:?}", url, status, wait);
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(match status {
                        StatusCode::NOT_FOUND | StatusCode::GONE => {
                            FetchOutcome::Absent(status.as_u16())
                        }
                        _ => FetchOutcome::HttpStatus(status.as_u16()),
                    });
                }
                Err(e) => {
                    if attempt < self.retries {
                        let wait = self.backoff(attempt);
                        debug!("Request to {} failed ({}), retrying in {:?}", url, e, wait);
                        tokio::time::sleep(wait).await;
                        attempt += 1;
                        continue;
                    }
                    warn!("Request to {} failed: {}", url, e);
                    return Err(FetchOutcome::Transport(e.to_string()));
                }
            }
        }
    }

    async fn read_body(&self, mut response: Response) -> std::result::Result<Fetched, FetchOutcome> {
        if let Some(length) = response.content_length()
            && length > self.max_body_bytes
        {
            return Err(FetchOutcome::TooLarge(length));
        }

        let url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut bytes: Vec<u8> = Vec::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    bytes.extend_from_slice(&chunk);
                    if bytes.len() as u64 > self.max_body_bytes {
                        return Err(FetchOutcome::TooLarge(bytes.len() as u64));
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(FetchOutcome::Transport(e.to_string())),
            }
        }

        if bytes.starts_with(&GZIP_MAGIC) {
            bytes = self.gunzip(&bytes)?;
        }

        Ok(Fetched {
            url,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Inflate a gzip-compressed file. The size cap applies to the
    /// decompressed document too.
    fn gunzip(&self, compressed: &[u8]) -> std::result::Result<Vec<u8>, FetchOutcome> {
        let mut inflated = Vec::new();
        GzDecoder::new(compressed)
            .take(self.max_body_bytes + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| FetchOutcome::Parse(format!("invalid gzip body: {}", e)))?;

        if inflated.len() as u64 > self.max_body_bytes {
            return Err(FetchOutcome::TooLarge(inflated.len() as u64));
        }
        Ok(inflated)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `Retry-After` in delta-seconds form. HTTP-date values fall back to backoff.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
