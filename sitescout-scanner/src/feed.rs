//! RSS and Atom feed parsing, plus feed autodiscovery from HTML.

use crate::canonical;
use crate::error::{Result, ScanError};
use crate::sitemap::{parse_lastmod, sniff_root};
use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Well-known feed locations probed relative to the site root.
pub const COMMON_FEED_PATHS: &[&str] = &["/feed/", "/rss/", "/atom.xml", "/feed.xml"];

/// Item child elements whose text is harvested.
const ITEM_FIELDS: &[&str] = &["link", "guid", "pubdate", "updated", "published", "date"];

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub link: String,
    pub updated: Option<DateTime<Utc>>,
}

/// True for the root elements of RSS 2.0, RSS 1.0 (RDF) and Atom documents.
pub fn is_feed_root(root: &str) -> bool {
    matches!(root, "rss" | "feed" | "rdf")
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into its item links.
///
/// RSS items use `<link>` text, falling back to a permalink `<guid>`. Atom
/// entries use the `href` of a `<link>` whose `rel` is absent or
/// `alternate`. Items without a link are skipped.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    match sniff_root(xml)?.as_deref() {
        Some(root) if is_feed_root(root) => {}
        Some(other) => {
            return Err(ScanError::ParseError(format!(
                "not a feed (root element <{}>)",
                other
            )));
        }
        None => return Err(ScanError::ParseError("empty document".to_string())),
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut in_item = false;
    let mut current_element: Option<String> = None;
    let mut guid_is_permalink = true;
    let mut link: Option<String> = None;
    let mut guid: Option<String> = None;
    let mut updated: Option<DateTime<Utc>> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "item" || name == "entry" {
                    in_item = true;
                    guid_is_permalink = true;
                    link = None;
                    guid = None;
                    updated = None;
                } else if in_item {
                    if name == "link" && let Some(href) = atom_link_href(&e) {
                        link.get_or_insert(href);
                    } else {
                        if name == "guid" {
                            guid_is_permalink = attr_value(&e, "isPermaLink")
                                .map(|v| !v.eq_ignore_ascii_case("false"))
                                .unwrap_or(true);
                        }
                        // Only harvested fields are unescaped.
                        if ITEM_FIELDS.contains(&name.as_str()) {
                            current_element = Some(name);
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if in_item && local_name(&e) == "link" && let Some(href) = atom_link_href(&e) {
                    link.get_or_insert(href);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                if (name == "item" || name == "entry") && in_item {
                    if let Some(found) = link.take().or_else(|| guid.take()) {
                        items.push(FeedItem {
                            link: found,
                            updated: updated.take(),
                        });
                    }
                    in_item = false;
                }
                current_element = None;
            }
            Event::Text(e) => {
                if let Some(ref element) = current_element {
                    let text = e
                        .unescape()
                        .map_err(|e| ScanError::ParseError(e.to_string()))?;
                    let text = text.trim();
                    match element.as_str() {
                        "link" if !text.is_empty() => {
                            link.get_or_insert_with(|| text.to_string());
                        }
                        "guid" if guid_is_permalink && text.starts_with("http") => {
                            guid = Some(text.to_string());
                        }
                        "pubdate" | "updated" | "published" | "date" => {
                            if updated.is_none() {
                                updated = parse_feed_date(text);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::CData(e) => {
                if current_element.as_deref() == Some("link") {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw).trim().to_string();
                    if !text.is_empty() {
                        link.get_or_insert(text);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

/// Feed URLs advertised by `<link rel="alternate">` tags in an HTML page.
pub fn extract_feed_links(html: &str, page_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(r#"link[rel~="alternate"][href]"#) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut feeds = Vec::new();

    for element in document.select(&selector) {
        let is_feed_type = element
            .value()
            .attr("type")
            .map(|t| {
                let t = t.to_ascii_lowercase();
                t.contains("rss+xml") || t.contains("atom+xml")
            })
            .unwrap_or(false);

        if !is_feed_type {
            continue;
        }

        if let Some(href) = element.value().attr("href")
            && let Some(url) = canonical::resolve(page_url, href)
            && seen.insert(url.clone())
        {
            feeds.push(url);
        }
    }

    feeds
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase()
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// `href` of an Atom `<link>` that points at the entry itself.
fn atom_link_href(e: &BytesStart<'_>) -> Option<String> {
    let href = attr_value(e, "href")?;
    match attr_value(e, "rel") {
        None => Some(href),
        Some(rel) if rel.eq_ignore_ascii_case("alternate") => Some(href),
        Some(_) => None,
    }
}

/// RSS uses RFC 2822 dates, Atom and Dublin Core use RFC 3339.
fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_lastmod(s)
}
