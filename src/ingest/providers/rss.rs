// src/ingest/providers/rss.rs
use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{Feed, FeedEntry, FeedError, FeedKind, FeedSource};

// ---- RSS 2.0 ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded", alias = "content:encoded")]
    content_encoded: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<String>,
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<String>,
    content: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) is the article link.
    fn article_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

/// RFC 2822 (RSS) or RFC 3339 (Atom); `None` when neither parses.
fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    let dt = OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()?;
    DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

/// Local name of the document's root element.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
}

/// Parse an RSS 2.0 or Atom document into a `Feed` (entries in document order).
pub fn parse_feed(xml: &str) -> Result<Feed, FeedError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let feed = match root_element(&xml_clean).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(&xml_clean).map_err(|e| FeedError::Parse(e.to_string()))?;
            Feed {
                title: rss.channel.title,
                entries: rss
                    .channel
                    .item
                    .into_iter()
                    .map(|it| FeedEntry {
                        kind: FeedKind::Rss,
                        title: it.title,
                        link: it.link,
                        content: it.content_encoded,
                        description: it.description,
                        published_at: it.pub_date.as_deref().and_then(parse_feed_date),
                    })
                    .collect(),
            }
        }
        Some("feed") => {
            let xml_atom = wrap_xhtml_bodies(&xml_clean);
            let atom: AtomFeed =
                from_str(&xml_atom).map_err(|e| FeedError::Parse(e.to_string()))?;
            Feed {
                title: atom.title,
                entries: atom
                    .entry
                    .into_iter()
                    .map(|en| {
                        let link = en.article_link();
                        let published_at = en
                            .published
                            .as_deref()
                            .or(en.updated.as_deref())
                            .and_then(parse_feed_date);
                        FeedEntry {
                            kind: FeedKind::Atom,
                            title: en.title,
                            link,
                            content: en.content,
                            description: en.summary,
                            published_at,
                        }
                    })
                    .collect(),
            }
        }
        Some(other) => {
            return Err(FeedError::Parse(format!("unexpected root element <{other}>")));
        }
        None => return Err(FeedError::Parse("no root element".to_string())),
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_entries_total").increment(feed.entries.len() as u64);
    Ok(feed)
}

pub struct RssFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

impl RssFeedProvider {
    /// Serve a fixed document (tests, offline runs).
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }
}

#[async_trait]
impl FeedSource for RssFeedProvider {
    async fn fetch(&self) -> Result<Feed, FeedError> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http { url, client } => {
                let resp = client.get(url.as_str()).send().await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FeedError::Status(status));
                }
                let body = resp.text().await?;
                parse_feed(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

/// HTML-only entities that are not defined in XML and would break the parser.
const HTML_ONLY_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", "\u{a0}"),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&ldquo;", "\u{201c}"),
    ("&rdquo;", "\u{201d}"),
    ("&lsquo;", "\u{2018}"),
    ("&rsquo;", "\u{2019}"),
    ("&hellip;", "\u{2026}"),
];

/// Replace HTML-only entities with their characters, outside CDATA sections.
/// CDATA is left as is; `strip_markup` decodes entities there later.
fn scrub_html_entities_for_xml(s: &str) -> String {
    const OPEN: &str = "<![CDATA[";
    const CLOSE: &str = "]]>";

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    loop {
        let (plain, tail) = match rest.find(OPEN) {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        let scrubbed = HTML_ONLY_ENTITIES
            .iter()
            .fold(plain.to_string(), |acc, (from, to)| acc.replace(from, to));
        out.push_str(&scrubbed);
        if tail.is_empty() {
            return out;
        }
        let cdata_end = tail.find(CLOSE).map_or(tail.len(), |i| i + CLOSE.len());
        out.push_str(&tail[..cdata_end]);
        rest = &tail[cdata_end..];
    }
}

/// Atom `content`/`summary` elements that carry inline XHTML children.
fn is_xhtml_body(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"content" | b"summary")
        && matches!(
            e.try_get_attribute("type"),
            Ok(Some(attr)) if &*attr.value == b"xhtml"
        )
}

/// Rewrite `type="xhtml"` Atom bodies as CDATA text so they deserialize into
/// a plain string (markup kept, stripped later like any HTML body).
fn wrap_xhtml_bodies(xml: &str) -> Cow<'_, str> {
    if !xml.contains("xhtml") {
        return Cow::Borrowed(xml);
    }

    let mut reader = Reader::from_str(xml);
    let mut out = String::with_capacity(xml.len() + 64);
    let mut copied = 0;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if is_xhtml_body(&e) => {
                let open_end = reader.buffer_position() as usize;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let Ok(inner) = reader.read_text(QName(name.as_bytes())) else {
                    break;
                };
                out.push_str(&xml[copied..open_end]);
                out.push_str("<![CDATA[");
                out.push_str(&inner.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]></");
                out.push_str(&name);
                out.push('>');
                copied = reader.buffer_position() as usize;
            }
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out.push_str(&xml[copied..]);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Good News Network</title>
    <atom:link href="https://example.test/feed/" rel="self" type="application/rss+xml"/>
    <link>https://example.test</link>
    <description>Daily good news</description>
    <item>
      <title>Kenya opens new wildlife corridor</title>
      <link>https://example.test/kenya</link>
      <pubDate>Mon, 01 Sep 2025 10:00:00 +0000</pubDate>
      <category>Animals</category>
      <category>World</category>
      <description><![CDATA[<p>Short teaser&nbsp;text</p>]]></description>
      <content:encoded><![CDATA[<p>Full <b>story</b> here</p>]]></content:encoded>
    </item>
    <item>
      <title>No date here</title>
      <link>https://example.test/nodate</link>
      <description>Plain description</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom News</title>
  <entry>
    <title>Peru plants a million trees</title>
    <link rel="alternate" href="https://example.test/peru"/>
    <updated>2025-09-02T08:30:00Z</updated>
    <summary>Reforestation in the Andes</summary>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss_items_in_order() {
        let feed = parse_feed(RSS).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Good News Network"));
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.kind, FeedKind::Rss);
        assert_eq!(first.title.as_deref(), Some("Kenya opens new wildlife corridor"));
        assert_eq!(first.link.as_deref(), Some("https://example.test/kenya"));
        assert_eq!(first.content.as_deref(), Some("<p>Full <b>story</b> here</p>"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap())
        );

        let second = &feed.entries[1];
        assert_eq!(second.published_at, None);
        assert_eq!(second.content, None);
        assert_eq!(second.description.as_deref(), Some("Plain description"));
    }

    #[test]
    fn parses_atom_entries() {
        let feed = parse_feed(ATOM).unwrap();
        assert_eq!(feed.title.as_deref(), Some("Atom News"));
        let e = &feed.entries[0];
        assert_eq!(e.link.as_deref(), Some("https://example.test/peru"));
        assert_eq!(e.description.as_deref(), Some("Reforestation in the Andes"));
        assert_eq!(
            e.published_at,
            Some(Utc.with_ymd_and_hms(2025, 9, 2, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn atom_xhtml_content_is_kept_as_markup_text() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom News</title>
  <entry>
    <title>Chile protects a new marine park</title>
    <link href="https://example.test/chile"/>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Divers <b>cheer</b> in Chile</p></div></content>
  </entry>
  <entry>
    <title>Second</title>
    <content type="html">&lt;p&gt;escaped html&lt;/p&gt;</content>
  </entry>
</feed>"#;
        let feed = parse_feed(xml).unwrap();
        assert_eq!(feed.entries.len(), 2);

        let first = &feed.entries[0];
        assert_eq!(first.kind, FeedKind::Atom);
        let body = first.content.as_deref().unwrap();
        assert!(body.contains("<b>cheer</b>"), "unexpected body: {body}");
        assert_eq!(crate::ingest::strip_markup(body), "Divers cheer in Chile");
        assert_eq!(feed.entries[1].content.as_deref(), Some("<p>escaped html</p>"));
    }

    #[test]
    fn entity_scrub_leaves_cdata_untouched() {
        let s = "<a>x&nbsp;y</a><b><![CDATA[p&nbsp;q]]></b><c>&hellip;</c>";
        assert_eq!(
            scrub_html_entities_for_xml(s),
            "<a>x\u{a0}y</a><b><![CDATA[p&nbsp;q]]></b><c>\u{2026}</c>"
        );

        let feed = parse_feed(RSS).unwrap();
        let teaser = feed.entries[0].description.as_deref().unwrap();
        assert_eq!(crate::ingest::strip_markup(teaser), "Short teaser\u{a0}text");
    }

    #[test]
    fn rejects_non_feed_documents() {
        assert!(matches!(
            parse_feed("<html><body>oops</body></html>"),
            Err(FeedError::Parse(_))
        ));
        assert!(matches!(parse_feed("not xml at all"), Err(FeedError::Parse(_))));
    }

    #[test]
    fn unparsable_date_is_treated_as_missing() {
        assert_eq!(parse_feed_date("yesterday-ish"), None);
        assert!(parse_feed_date(" Tue, 02 Sep 2025 07:15:00 +0000 ").is_some());
    }

    #[tokio::test]
    async fn fixture_provider_fetches() {
        let p = RssFeedProvider::from_fixture_str(RSS);
        let feed = p.fetch().await.unwrap();
        assert_eq!(feed.entries.len(), 2);
        assert_eq!(p.name(), "rss");
    }
}
