//! URL canonicalization used for deduplication.
//!
//! Policy: scheme and host are lowercased, default ports dropped, dot segments
//! resolved (all done by `url`), fragments removed, repeated slashes collapsed
//! and a trailing slash stripped unless the path is `/`. The query string is
//! kept verbatim. Path case, `www.` and the scheme are preserved, so
//! `http://a.com/x` and `https://a.com/x` are distinct pages.

use crate::error::{Result, ScanError};
use url::Url;

/// Canonical form of an absolute http(s) URL, or `None` if it isn't one.
pub fn canonicalize(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    canonicalize_url(url)
}

pub fn canonicalize_url(mut url: Url) -> Option<String> {
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    url.set_fragment(None);

    let mut path = collapse_slashes(url.path());
    if path.len() > 1 && path.ends_with('/') {
        path = path.trim_end_matches('/').to_string();
        if path.is_empty() {
            path.push('/');
        }
    }
    url.set_path(&path);

    Some(url.to_string())
}

/// Resolve `href` against `base` and canonicalize the result.
pub fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let joined = base.join(href).ok()?;
    canonicalize_url(joined)
}

/// Turn user input (`example.com`, `https://example.com/docs`) into the site
/// origin that well-known paths are probed against.
pub fn normalize_base(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ScanError::InvalidUrl("empty base URL".to_string()));
    }

    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let mut url = Url::parse(&with_scheme)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScanError::InvalidUrl(format!(
            "unsupported scheme '{}' in {}",
            url.scheme(),
            input
        )));
    }
    if url.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!("no host in {}", input)));
    }

    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
