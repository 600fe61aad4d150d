//! `llms.txt` link extraction.
//!
//! An llms.txt file is markdown; every inline link `[title](url)` is taken
//! as a page of interest.

use crate::canonical;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("markdown link pattern is valid")
});

/// Canonical http(s) URLs linked from an llms.txt body, in document order.
pub fn parse_llms_txt(content: &str, llms_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for captures in MARKDOWN_LINK.captures_iter(content) {
        let Some(target) = captures.get(1) else {
            continue;
        };

        if let Some(url) = canonical::resolve(llms_url, target.as_str())
            && seen.insert(url.clone())
        {
            urls.push(url);
        }
    }

    urls
}
