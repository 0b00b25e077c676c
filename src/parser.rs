//! Format-agnostic feed parsing.
//!
//! A document is read into an [`XmlNode`] tree that keeps namespaces,
//! attributes and text apart, so `<link>` and `<atom:link>` never mix. The
//! root element decides which schema the tree is read with; both schemas
//! normalize into the same [`FeedEntry`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sanitize::sanitize;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// RSS 2.0 elements carry no namespace.
const RSS_NAMESPACES: &[Option<&str>] = &[None];
const ATOM_NAMESPACES: &[Option<&str>] = &[None, Some(ATOM_NS)];

/// One item as read from a feed, before it is tagged with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    /// May be empty when the feed gives no link
    pub link: String,
    /// Sanitized, may be empty
    pub description: String,
    pub date: DateTime<Utc>,
    /// Date text as the feed gave it, if any
    pub raw_date: Option<String>,
}

/// An element with its resolved namespace, attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Local name, without prefix
    pub name: String,
    /// Namespace URI; an undeclared prefix stands in for its namespace
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    /// Direct text and CDATA of this element
    pub text: String,
    pub children: Vec<XmlNode>,
}

/// A parsed feed document, by schema.
#[derive(Debug)]
pub enum FeedDocument {
    /// RSS 2.0: `<rss><channel><item>...`
    Rss(XmlNode),
    /// Atom: `<feed><entry>...`
    Atom(XmlNode),
    /// Well-formed XML with some other root element
    Unrecognized(String),
}

impl XmlNode {
    /// Reads a whole document into a tree, failing on anything that is not
    /// well-formed XML with exactly one root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            match event {
                Event::Start(e) => stack.push(XmlNode::open(ns, &e)?),
                Event::Empty(e) => {
                    let node = XmlNode::open(ns, &e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Parse("unexpected closing tag".to_string()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(text) => append_text(&mut stack, &text.unescape()?)?,
                Event::CData(data) => append_text(&mut stack, &String::from_utf8_lossy(&data))?,
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Parse("unexpected end of document".to_string()));
        }

        root.ok_or_else(|| Error::Parse("document has no root element".to_string()))
    }

    fn open(ns: ResolveResult, start: &BytesStart) -> Result<Self> {
        let namespace = match ns {
            ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
            ResolveResult::Unknown(prefix) => Some(String::from_utf8_lossy(&prefix).into_owned()),
            ResolveResult::Unbound => None,
        };

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            attributes.push((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                attr.unescape_value()?.into_owned(),
            ));
        }

        Ok(XmlNode {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            namespace,
            attributes,
            ..Default::default()
        })
    }

    /// True for an element called `name` in one of `namespaces`.
    pub fn is(&self, name: &str, namespaces: &[Option<&str>]) -> bool {
        self.name == name && namespaces.iter().any(|ns| *ns == self.namespace.as_deref())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            let inner = child.text_content();
            if !inner.is_empty() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&inner);
            }
        }
        text
    }

    fn children_named<'a>(
        &'a self,
        name: &'a str,
        namespaces: &'a [Option<&'a str>],
    ) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children
            .iter()
            .filter(move |child| child.is(name, namespaces))
    }

    /// Trimmed text of the first matching child, if it has any.
    fn child_text(&self, name: &str, namespaces: &[Option<&str>]) -> Option<String> {
        self.children_named(name, namespaces)
            .next()
            .map(|child| child.text_content().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::Parse("multiple root elements".to_string())),
    }
    Ok(())
}

fn append_text(stack: &mut [XmlNode], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(node) => {
            if !node.text.is_empty() && !text.is_empty() {
                node.text.push(' ');
            }
            node.text.push_str(text);
        }
        None if text.trim().is_empty() => {}
        None => return Err(Error::Parse("text outside the root element".to_string())),
    }
    Ok(())
}

impl FeedDocument {
    /// Reads a document, picking the schema from its root element.
    ///
    /// Fails only when the XML is not well-formed; an unknown root is not an
    /// error.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root = XmlNode::parse(xml.trim_start_matches('\u{feff}'))?;

        if root.is("rss", RSS_NAMESPACES) {
            Ok(FeedDocument::Rss(root))
        } else if root.is("feed", ATOM_NAMESPACES) {
            Ok(FeedDocument::Atom(root))
        } else {
            Ok(FeedDocument::Unrecognized(root.name))
        }
    }

    /// Normalizes the document's items. Items without a title are dropped;
    /// missing or unparseable dates become `now`.
    pub fn into_entries(self, now: DateTime<Utc>) -> Vec<FeedEntry> {
        let entries = match self {
            FeedDocument::Rss(root) => rss_entries(&root, now),
            FeedDocument::Atom(root) => atom_entries(&root, now),
            FeedDocument::Unrecognized(root) => {
                debug!(root = %root, "Unrecognized feed root element");
                Vec::new()
            }
        };

        entries
            .into_iter()
            .filter(|entry| !entry.title.is_empty())
            .collect()
    }
}

fn rss_entries(root: &XmlNode, now: DateTime<Utc>) -> Vec<FeedEntry> {
    let Some(channel) = root.children_named("channel", RSS_NAMESPACES).next() else {
        return Vec::new();
    };

    channel
        .children_named("item", RSS_NAMESPACES)
        .map(|item| {
            let raw_date = item.child_text("pubDate", RSS_NAMESPACES);
            FeedEntry {
                title: item.child_text("title", RSS_NAMESPACES).unwrap_or_default(),
                link: item.child_text("link", RSS_NAMESPACES).unwrap_or_default(),
                description: item
                    .child_text("description", RSS_NAMESPACES)
                    .map(|text| sanitize(&text))
                    .unwrap_or_default(),
                date: resolve_date(raw_date.as_deref(), now),
                raw_date,
            }
        })
        .collect()
}

fn atom_entries(root: &XmlNode, now: DateTime<Utc>) -> Vec<FeedEntry> {
    root.children_named("entry", ATOM_NAMESPACES)
        .map(|entry| {
            let raw_date = entry
                .child_text("published", ATOM_NAMESPACES)
                .or_else(|| entry.child_text("updated", ATOM_NAMESPACES));
            FeedEntry {
                title: entry.child_text("title", ATOM_NAMESPACES).unwrap_or_default(),
                link: atom_link(entry),
                description: entry
                    .child_text("summary", ATOM_NAMESPACES)
                    .or_else(|| entry.child_text("content", ATOM_NAMESPACES))
                    .map(|text| sanitize(&text))
                    .unwrap_or_default(),
                date: resolve_date(raw_date.as_deref(), now),
                raw_date,
            }
        })
        .collect()
}

/// Prefers the alternate link, then any link with an `href`, then link text.
fn atom_link(entry: &XmlNode) -> String {
    let links = || entry.children_named("link", ATOM_NAMESPACES);
    let href = |link: &XmlNode| -> Option<String> {
        link.attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
    };

    links()
        .filter(|link| matches!(link.attr("rel"), None | Some("alternate")))
        .find_map(href)
        .or_else(|| links().find_map(href))
        .or_else(|| {
            links()
                .map(|link| link.text_content().trim().to_string())
                .find(|text| !text.is_empty())
        })
        .unwrap_or_default()
}

/// Parses RSS 2.0 or Atom XML into normalized entries.
pub fn parse(xml: &str) -> Result<Vec<FeedEntry>> {
    Ok(FeedDocument::from_xml(xml)?.into_entries(Utc::now()))
}

fn resolve_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => now,
        Some(raw) => parse_date(raw).unwrap_or_else(|| {
            debug!(date = raw, "Unparseable item date, using current time");
            now
        }),
    }
}

/// Parses the date formats feeds use in practice: RFC 2822 (RSS), RFC 3339
/// (Atom), and a few zone-less variants read as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn entries(xml: &str) -> Vec<FeedEntry> {
        FeedDocument::from_xml(xml).unwrap().into_entries(now())
    }

    mod rss_tests {
        use super::*;

        #[test]
        fn test_parse_rss_items_in_order() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
                    <channel>
                        <title>AFM nieuws</title>
                        <link>https://www.afm.nl</link>
                        <atom:link href="https://www.afm.nl/rss" rel="self"/>
                        <item>
                            <title>First</title>
                            <link>https://example.com/1</link>
                            <description><![CDATA[<p>Hello <b>there</b></p>]]></description>
                            <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                        </item>
                        <item>
                            <title>Second</title>
                            <link>https://example.com/2</link>
                            <description>&lt;p&gt;Escaped&lt;/p&gt;</description>
                            <pubDate>Tue, 10 Dec 2024 08:30:00 +0100</pubDate>
                        </item>
                    </channel>
                </rss>"#;

            let items = entries(xml);

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].title, "First");
            assert_eq!(items[0].link, "https://example.com/1");
            assert_eq!(items[0].description, "Hello there");
            assert_eq!(
                items[0].date,
                Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap()
            );
            assert_eq!(items[1].title, "Second");
            assert_eq!(items[1].description, "Escaped");
            assert_eq!(
                items[1].date,
                Utc.with_ymd_and_hms(2024, 12, 10, 7, 30, 0).unwrap()
            );
        }

        #[test]
        fn test_single_item() {
            let xml = r#"<rss><channel><item><title>Only</title></item></channel></rss>"#;
            let items = entries(xml);
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].link, "");
            assert_eq!(items[0].description, "");
        }

        #[test]
        fn test_missing_date_defaults_to_now() {
            let xml = r#"<rss><channel><item><title>Undated</title></item></channel></rss>"#;
            assert_eq!(entries(xml)[0].date, now());
        }

        #[test]
        fn test_unparseable_date_defaults_to_now() {
            let xml = r#"<rss><channel><item>
                <title>Odd date</title><pubDate>sometime last week</pubDate>
            </item></channel></rss>"#;
            let items = entries(xml);
            assert_eq!(items[0].date, now());
            assert_eq!(items[0].raw_date.as_deref(), Some("sometime last week"));
        }

        #[test]
        fn test_raw_date_is_kept_trimmed() {
            let xml = r#"<rss><channel><item>
                <title>Dated</title><pubDate>  Mon, 09 Dec 2024 12:00:00 GMT  </pubDate>
            </item></channel></rss>"#;
            let items = entries(xml);
            assert_eq!(items[0].raw_date.as_deref(), Some("Mon, 09 Dec 2024 12:00:00 GMT"));
        }

        #[test]
        fn test_namespaced_siblings_are_ignored() {
            let xml = r#"<rss version="2.0"
                    xmlns:atom="http://www.w3.org/2005/Atom"
                    xmlns:dc="http://purl.org/dc/elements/1.1/">
                <channel>
                    <item>
                        <title>Plain title</title>
                        <dc:title>Dublin Core title</dc:title>
                        <link>https://example.com/item</link>
                        <atom:link href="https://example.com/self" rel="self"/>
                        <dc:date>2024-12-09T12:00:00Z</dc:date>
                    </item>
                    <item>
                        <atom:link href="https://example.com/other" rel="self"/>
                        <title>Second</title>
                        <link>https://example.com/second</link>
                    </item>
                </channel>
            </rss>"#;

            let items = entries(xml);

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].title, "Plain title");
            assert_eq!(items[0].link, "https://example.com/item");
            assert_eq!(items[0].raw_date, None);
            assert_eq!(items[1].title, "Second");
            assert_eq!(items[1].link, "https://example.com/second");
        }

        #[test]
        fn test_undeclared_prefix_is_ignored() {
            let xml = r#"<rss><channel><item>
                <title>Kept</title><media:title>Foreign</media:title>
            </item></channel></rss>"#;
            let items = entries(xml);
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].title, "Kept");
        }

        #[test]
        fn test_untitled_items_are_dropped() {
            let xml = r#"<rss><channel>
                <item><title>Kept</title></item>
                <item><link>https://example.com/no-title</link></item>
                <item><title>   </title></item>
                <item><title>Also kept</title></item>
            </channel></rss>"#;

            let titles: Vec<_> = entries(xml).into_iter().map(|e| e.title).collect();
            assert_eq!(titles, vec!["Kept", "Also kept"]);
        }

        #[test]
        fn test_channel_without_items() {
            let xml = r#"<rss><channel><title>Empty</title></channel></rss>"#;
            assert!(entries(xml).is_empty());
        }

        #[test]
        fn test_rss_without_channel() {
            assert!(entries("<rss version=\"2.0\"/>").is_empty());
        }
    }

    mod atom_tests {
        use super::*;

        #[test]
        fn test_parse_atom_entries() {
            let xml = r#"<?xml version="1.0" encoding="utf-8"?>
                <feed xmlns="http://www.w3.org/2005/Atom">
                    <title>ESMA news</title>
                    <link href="https://www.esma.europa.eu" rel="alternate"/>
                    <entry>
                        <title type="html">ESMA publishes guidelines</title>
                        <link rel="self" href="https://example.com/self"/>
                        <link rel="alternate" href="https://example.com/a"/>
                        <summary type="html">&lt;p&gt;Short summary&lt;/p&gt;</summary>
                        <content type="html">Long content</content>
                        <published>2024-03-01T10:00:00Z</published>
                        <updated>2024-03-02T10:00:00Z</updated>
                    </entry>
                    <entry>
                        <title>Plain title</title>
                        <link href="https://example.com/b"/>
                        <content>Only content</content>
                        <updated>2024-02-01T09:00:00+01:00</updated>
                    </entry>
                </feed>"#;

            let items = entries(xml);

            assert_eq!(items.len(), 2);
            assert_eq!(items[0].title, "ESMA publishes guidelines");
            assert_eq!(items[0].link, "https://example.com/a");
            assert_eq!(items[0].description, "Short summary");
            assert_eq!(
                items[0].date,
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
            );
            assert_eq!(items[1].title, "Plain title");
            assert_eq!(items[1].link, "https://example.com/b");
            assert_eq!(items[1].description, "Only content");
            assert_eq!(
                items[1].date,
                Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap()
            );
        }

        #[test]
        fn test_media_content_does_not_replace_content() {
            let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"
                    xmlns:media="http://search.yahoo.com/mrss/">
                <entry>
                    <title>With media</title>
                    <link href="https://example.com/m"/>
                    <media:content url="https://example.com/image.png" medium="image"/>
                    <content type="html">Real content</content>
                </entry>
            </feed>"#;

            let items = entries(xml);

            assert_eq!(items.len(), 1);
            assert_eq!(items[0].description, "Real content");
            assert_eq!(items[0].link, "https://example.com/m");
        }

        #[test]
        fn test_prefixed_atom_feed() {
            let xml = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom">
                <a:entry>
                    <a:title>Prefixed</a:title>
                    <a:link href="https://example.com/p"/>
                    <a:updated>2024-03-02T10:00:00Z</a:updated>
                </a:entry>
            </a:feed>"#;

            let items = entries(xml);

            assert_eq!(items.len(), 1);
            assert_eq!(items[0].title, "Prefixed");
            assert_eq!(items[0].link, "https://example.com/p");
            assert_eq!(items[0].raw_date.as_deref(), Some("2024-03-02T10:00:00Z"));
        }

        #[test]
        fn test_xhtml_content_text() {
            let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
                <title>Xhtml</title>
                <content type="xhtml">
                    <div xmlns="http://www.w3.org/1999/xhtml"><p>Inline <b>markup</b></p></div>
                </content>
            </entry></feed>"#;
            assert_eq!(entries(xml)[0].description, "Inline markup");
        }

        #[test]
        fn test_link_falls_back_to_first_href() {
            let xml = r#"<feed><entry>
                <title>Self only</title>
                <link rel="self" href="https://example.com/self"/>
            </entry></feed>"#;
            assert_eq!(entries(xml)[0].link, "https://example.com/self");
        }

        #[test]
        fn test_link_text_form() {
            let xml = r#"<feed><entry>
                <title>Text link</title>
                <link>https://example.com/text</link>
            </entry></feed>"#;
            assert_eq!(entries(xml)[0].link, "https://example.com/text");
        }

        #[test]
        fn test_no_dates_defaults_to_now() {
            let xml = r#"<feed><entry><title>Undated</title></entry></feed>"#;
            let items = entries(xml);
            assert_eq!(items[0].date, now());
            assert_eq!(items[0].link, "");
        }

        #[test]
        fn test_untitled_entries_are_dropped() {
            let xml = r#"<feed>
                <entry><title>Kept</title></entry>
                <entry><summary>No title</summary></entry>
            </feed>"#;
            assert_eq!(entries(xml).len(), 1);
        }
    }

    mod detection_tests {
        use super::*;

        #[test]
        fn test_detects_variants() {
            assert!(matches!(
                FeedDocument::from_xml("<rss><channel/></rss>").unwrap(),
                FeedDocument::Rss(_)
            ));
            assert!(matches!(
                FeedDocument::from_xml("<feed/>").unwrap(),
                FeedDocument::Atom(_)
            ));
            assert!(matches!(
                FeedDocument::from_xml("<html><body>Not a feed</body></html>").unwrap(),
                FeedDocument::Unrecognized(root) if root == "html"
            ));
        }

        #[test]
        fn test_feed_in_foreign_namespace_is_unrecognized() {
            let xml = r#"<feed xmlns="http://example.com/not-atom">
                <entry><title>X</title></entry>
            </feed>"#;
            assert!(matches!(
                FeedDocument::from_xml(xml).unwrap(),
                FeedDocument::Unrecognized(root) if root == "feed"
            ));
        }

        #[test]
        fn test_unrecognized_shape_yields_no_items() {
            let xml = "<rdf><item><title>Ignored</title></item></rdf>";
            assert!(parse(xml).unwrap().is_empty());
        }

        #[test]
        fn test_malformed_xml_is_parse_error() {
            let cases = [
                "",
                "   ",
                "<rss><channel></rss>",
                "<rss><channel>",
                "<rss/><rss/>",
                "not xml at all",
            ];

            for xml in cases {
                let result = parse(xml);
                assert!(
                    matches!(result, Err(Error::Parse(_))),
                    "expected parse error for {xml:?}, got {result:?}"
                );
            }
        }

        #[test]
        fn test_byte_order_mark_is_ignored() {
            let xml = "\u{feff}<rss><channel><item><title>BOM</title></item></channel></rss>";
            assert_eq!(parse(xml).unwrap().len(), 1);
        }
    }

    mod date_tests {
        use super::*;

        #[test]
        fn test_rfc2822() {
            assert_eq!(
                parse_date("Fri, 01 Mar 2024 09:15:00 GMT"),
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap())
            );
        }

        #[test]
        fn test_rfc3339() {
            assert_eq!(
                parse_date("2024-03-01T09:15:00+02:00"),
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 7, 15, 0).unwrap())
            );
        }

        #[test]
        fn test_zoneless_variants() {
            let expected = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap());
            assert_eq!(parse_date("2024-03-01T09:15:00"), expected);
            assert_eq!(parse_date("2024-03-01 09:15:00"), expected);
            assert_eq!(
                parse_date("2024-03-01"),
                Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_garbage() {
            assert_eq!(parse_date("not a date"), None);
            assert_eq!(parse_date(""), None);
        }
    }
}
