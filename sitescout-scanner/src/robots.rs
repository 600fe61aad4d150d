//! `Sitemap:` directive extraction from robots.txt.

use crate::canonical;
use std::collections::HashSet;
use url::Url;

/// Every `Sitemap:` URL in a robots.txt body, canonicalized, in file order
/// and without duplicates.
///
/// The keyword is matched case-insensitively and may appear anywhere in the
/// file (it is not bound to a user-agent group). Relative values are resolved
/// against the robots.txt URL.
pub fn parse_sitemap_directives(content: &str, robots_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sitemaps = Vec::new();

    for line in content.lines() {
        let line = line.trim_start_matches('\u{feff}').trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };

        if !directive.trim().eq_ignore_ascii_case("sitemap") {
            continue;
        }

        // "Sitemap: https://a.com/s.xml # primary" - drop the trailing comment
        let value = match value.find(" #") {
            Some(idx) => &value[..idx],
            None => value,
        };

        if let Some(url) = canonical::resolve(robots_url, value)
            && seen.insert(url.clone())
        {
            sitemaps.push(url);
        }
    }

    sitemaps
}
