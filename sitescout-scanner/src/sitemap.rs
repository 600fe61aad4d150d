//! Sitemap parsing.
//!
//! Handles both XML shapes from the sitemaps.org protocol:
//!
//! - `<urlset>` with `<url><loc>` page entries
//! - `<sitemapindex>` with `<sitemap><loc>` entries pointing at child sitemaps
//!
//! plus the plain-text format (one absolute URL per line). Fetching and the
//! recursive expansion of indexes live in [`crate::discoverer`]; everything
//! here is pure.

use crate::canonical;
use crate::error::{Result, ScanError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// One `<url>` or `<sitemap>` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    /// Page locations.
    UrlSet(Vec<SitemapEntry>),
    /// Child sitemap locations.
    Index(Vec<SitemapEntry>),
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        matches!(self, SitemapDocument::Index(_))
    }

    pub fn entries(&self) -> &[SitemapEntry] {
        match self {
            SitemapDocument::UrlSet(entries) | SitemapDocument::Index(entries) => entries,
        }
    }
}

/// Local name of the first element in an XML document, if any.
///
/// Stops as soon as the root is seen, so HTML error pages that are not
/// well-formed XML past their first tag still sniff as `html`.
pub fn sniff_root(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase();
                return Ok(Some(name));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Parse an XML sitemap or sitemap index.
///
/// Entries without a `<loc>` are skipped. `<loc>` values are trimmed and
/// entity-decoded but not canonicalized; callers resolve them against the
/// sitemap URL.
pub fn parse_sitemap_document(xml: &str) -> Result<SitemapDocument> {
    let root = sniff_root(xml)?;
    let container = match root.as_deref() {
        Some("urlset") => "url",
        Some("sitemapindex") => "sitemap",
        Some(other) => {
            return Err(ScanError::ParseError(format!(
                "not a sitemap (root element <{}>)",
                other
            )));
        }
        None => return Err(ScanError::ParseError("empty document".to_string())),
    };

    let entries = collect_entries(xml, container)?;

    if container == "sitemap" {
        Ok(SitemapDocument::Index(entries))
    } else {
        Ok(SitemapDocument::UrlSet(entries))
    }
}

fn collect_entries(xml: &str, container: &str) -> Result<Vec<SitemapEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut in_container = false;
    let mut current_element: Option<String> = None;
    let mut current_loc: Option<String> = None;
    let mut current_lastmod: Option<DateTime<Utc>> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == container {
                    in_container = true;
                    current_loc = None;
                    current_lastmod = None;
                } else if in_container && (name == "loc" || name == "lastmod") {
                    current_element = Some(name);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == container && in_container {
                    if let Some(loc) = current_loc.take() {
                        entries.push(SitemapEntry {
                            loc,
                            lastmod: current_lastmod.take(),
                        });
                    }
                    in_container = false;
                }
                current_element = None;
            }
            Event::Text(e) => {
                if let Some(ref element) = current_element {
                    let text = e
                        .unescape()
                        .map_err(|e| ScanError::ParseError(e.to_string()))?;
                    apply_field(element, text.trim(), &mut current_loc, &mut current_lastmod);
                }
            }
            Event::CData(e) => {
                if let Some(ref element) = current_element {
                    let raw = e.into_inner();
                    let text = String::from_utf8_lossy(&raw);
                    apply_field(element, text.trim(), &mut current_loc, &mut current_lastmod);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn apply_field(
    element: &str,
    text: &str,
    loc: &mut Option<String>,
    lastmod: &mut Option<DateTime<Utc>>,
) {
    match element {
        "loc" if !text.is_empty() => *loc = Some(text.to_string()),
        "lastmod" => *lastmod = parse_lastmod(text),
        _ => {}
    }
}

/// Parse a plain-text sitemap: one absolute URL per line.
///
/// Lines that are not absolute http(s) URLs are ignored.
pub fn parse_text_sitemap(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(canonical::canonicalize)
        .collect()
}

/// True if a body looks like XML rather than a text sitemap.
pub fn looks_like_xml(body: &str) -> bool {
    body.trim_start_matches('\u{feff}').trim_start().starts_with('<')
}

/// Parse a W3C datetime as used by `<lastmod>`.
///
/// Accepts `2024-01-15`, RFC 3339 (`2024-01-15T10:30:00Z`,
/// `2024-01-15T10:30:00+02:00`) and naive datetimes, which are taken as UTC.
pub(crate) fn parse_lastmod(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }

    // W3C allows minute precision with an offset: 2024-01-15T10:30+01:00
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }

    tracing::debug!(date_str = %s, "Could not parse lastmod date");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_urlset() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <url>
            <loc>https://example.com/page1</loc>
            <lastmod>2024-01-15T10:30:00+00:00</lastmod>
            <changefreq>weekly</changefreq>
          </url>
          <url><loc>https://example.com/page2</loc></url>
        </urlset>"#;

        let doc = parse_sitemap_document(xml).unwrap();
        assert!(!doc.is_index());
        let entries = doc.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loc, "https://example.com/page1");
        assert!(entries[0].lastmod.is_some());
        assert_eq!(entries[1].loc, "https://example.com/page2");
        assert!(entries[1].lastmod.is_none());
    }

    #[test]
    fn test_parses_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
        <sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sitemap><loc>https://example.com/a.xml</loc><lastmod>2024-02-01</lastmod></sitemap>
          <sitemap><loc>https://example.com/b.xml</loc></sitemap>
        </sitemapindex>"#;

        let doc = parse_sitemap_document(xml).unwrap();
        assert!(doc.is_index());
        let locs: Vec<_> = doc.entries().iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(locs, vec!["https://example.com/a.xml", "https://example.com/b.xml"]);
    }

    #[test]
    fn test_namespace_prefixed_elements() {
        let xml = r#"<?xml version="1.0"?>
        <sm:urlset xmlns:sm="http://www.sitemaps.org/schemas/sitemap/0.9">
          <sm:url><sm:loc>https://example.com/prefixed</sm:loc></sm:url>
        </sm:urlset>"#;

        let doc = parse_sitemap_document(xml).unwrap();
        assert_eq!(doc.entries()[0].loc, "https://example.com/prefixed");
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = r#"<urlset>
          <url><loc>https://example.com/page?foo=1&amp;bar=2</loc></url>
          <url><loc><![CDATA[https://example.com/cdata]]></loc></url>
        </urlset>"#;

        let doc = parse_sitemap_document(xml).unwrap();
        let locs: Vec<_> = doc.entries().iter().map(|e| e.loc.as_str()).collect();
        assert_eq!(
            locs,
            vec!["https://example.com/page?foo=1&bar=2", "https://example.com/cdata"]
        );
    }

    #[test]
    fn test_skips_entries_without_loc() {
        let xml = r#"<urlset>
          <url><lastmod>2024-01-15</lastmod></url>
          <url><loc>   </loc></url>
          <url><loc>https://example.com/page1</loc></url>
        </urlset>"#;

        let doc = parse_sitemap_document(xml).unwrap();
        assert_eq!(doc.entries().len(), 1);
    }

    #[test]
    fn test_loc_outside_container_ignored() {
        let xml = r#"<urlset><loc>https://example.com/stray</loc></urlset>"#;
        let doc = parse_sitemap_document(xml).unwrap();
        assert!(doc.entries().is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let xml = r#"<urlset>
          <url>
            <loc>https://example.com/page1
          </url>
        </urlset>"#;

        assert!(parse_sitemap_document(xml).is_err());
    }

    #[test]
    fn test_html_is_not_a_sitemap() {
        let html = "<!DOCTYPE html><html><head><meta charset=utf-8></head><body>404</body></html>";
        let err = parse_sitemap_document(html).unwrap_err();
        assert!(err.to_string().contains("<html>"));
    }

    #[test]
    fn test_empty_document_is_error() {
        assert!(parse_sitemap_document("").is_err());
        assert!(parse_sitemap_document("<?xml version=\"1.0\"?>").is_err());
    }

    #[test]
    fn test_sniff_root() {
        assert_eq!(
            sniff_root("<?xml version=\"1.0\"?><rss version=\"2.0\"></rss>").unwrap(),
            Some("rss".to_string())
        );
        assert_eq!(sniff_root("<feed xmlns=\"http://www.w3.org/2005/Atom\"/>").unwrap(), Some("feed".to_string()));
        assert_eq!(sniff_root("   ").unwrap(), None);
    }

    #[test]
    fn test_text_sitemap() {
        let text = "https://example.com/a\n\n  https://example.com/b/  \nnot-a-url\n# comment\n";
        assert_eq!(
            parse_text_sitemap(text),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_looks_like_xml() {
        assert!(looks_like_xml("  <?xml version=\"1.0\"?><urlset/>"));
        assert!(looks_like_xml("\u{feff}<urlset/>"));
        assert!(!looks_like_xml("https://example.com/a"));
    }

    #[test]
    fn test_lastmod_formats() {
        let date = parse_lastmod("2024-01-15").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-01-15");

        let zulu = parse_lastmod("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(zulu.format("%H:%M").to_string(), "10:30");

        let offset = parse_lastmod("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(offset.format("%H:%M").to_string(), "08:30");

        assert!(parse_lastmod("2024-01-15T10:30:00.123").is_some());
        assert!(parse_lastmod("2024-01-15T10:30+01:00").is_some());
        assert!(parse_lastmod("yesterday").is_none());
    }
}
