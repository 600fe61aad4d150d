// Page filtering applied after discovery

use serde::{Deserialize, Serialize};
use sitescout_scanner::Discovery;
use url::Url;

/// Extensions that mark a URL as a static asset rather than a page.
pub const ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "map", "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif",
    "tiff", "pdf", "zip", "gz", "tgz", "rar", "7z", "mp3", "wav", "ogg", "mp4", "webm", "mov",
    "avi", "flv", "woff", "woff2", "ttf", "eot",
];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageFilter {
    /// Keep only pages on the base host (`www.` and port ignored).
    pub same_domain: bool,
    /// Drop URLs whose path ends in an asset extension.
    pub pages_only: bool,
}

impl PageFilter {
    pub fn is_active(&self) -> bool {
        self.same_domain || self.pages_only
    }

    /// Remove filtered pages from `discovery` in place. Source and
    /// diagnostic records are left alone.
    pub fn apply(&self, discovery: &mut Discovery) {
        if !self.is_active() {
            return;
        }

        let domain = site_domain(&discovery.base_url);

        discovery.pages.retain(|page| {
            if self.same_domain {
                match domain {
                    Some(ref d) if is_same_domain(&page.url, d) => {}
                    _ => return false,
                }
            }
            !(self.pages_only && is_asset(&page.url))
        });
    }
}

/// Host of `url` lowercased, without a leading `www.` or trailing dot.
pub fn site_domain(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(host.to_string())
}

pub fn is_same_domain(url: &str, domain: &str) -> bool {
    site_domain(url).is_some_and(|d| d == domain)
}

pub fn is_asset(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let last_segment = parsed.path().rsplit('/').next().unwrap_or_default();

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            ASSET_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}
