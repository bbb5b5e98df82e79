use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// One `<item>` of a torrent RSS feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,

    /// Download location: the torrent enclosure, a magnet uri, or the item link.
    pub url: String,

    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    #[must_use]
    pub fn is_magnet(&self) -> bool {
        self.url.starts_with("magnet:")
    }
}

struct FeedRegex {
    item: Regex,
    title: Regex,
    link: Regex,
    enclosure: Regex,
    magnet: Regex,
    pub_date: Regex,
    cdata: Regex,
}

impl FeedRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<FeedRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    item: Regex::new(r"(?s)<item[^>]*>(.*?)</item>").ok()?,
                    title: Regex::new(r"(?s)<title>(.*?)</title>").ok()?,
                    link: Regex::new(r"(?s)<link>(.*?)</link>").ok()?,
                    enclosure: Regex::new(r#"<enclosure[^>]*\burl="([^"]*)""#).ok()?,
                    magnet: Regex::new(r"(?s)<(?:torrent:)?magnetURI>(.*?)</(?:torrent:)?magnetURI>")
                        .ok()?,
                    pub_date: Regex::new(r"<pubDate>([^<]*)</pubDate>").ok()?,
                    cdata: Regex::new(r"(?s)^<!\[CDATA\[(.*)\]\]>$").ok()?,
                })
            })
            .as_ref()
    }
}

fn extract_tag(xml: &str, re: &Regex) -> String {
    let Some(raw) = re.captures(xml).and_then(|c| c.get(1)) else {
        return String::new();
    };
    let raw = raw.as_str().trim();
    let inner = FeedRegex::get()
        .and_then(|r| r.cdata.captures(raw))
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());
    html_escape::decode_html_entities(inner).trim().to_string()
}

fn parse_item(item_xml: &str) -> Option<FeedItem> {
    let re = FeedRegex::get()?;

    // Some feeds put slashes in titles, which would read as a directory later.
    let title = extract_tag(item_xml, &re.title).replace('/', " ");

    let enclosure = extract_tag(item_xml, &re.enclosure);
    let magnet = extract_tag(item_xml, &re.magnet);
    let link = extract_tag(item_xml, &re.link);
    let url = [enclosure, magnet, link]
        .into_iter()
        .find(|u| !u.is_empty())?;

    if title.is_empty() {
        return None;
    }

    let published = DateTime::parse_from_rfc2822(&extract_tag(item_xml, &re.pub_date))
        .ok()
        .map(|d| d.with_timezone(&Utc));

    Some(FeedItem {
        title,
        url,
        published,
    })
}

/// Items of an RSS document; incomplete items are dropped.
#[must_use]
pub fn parse_feed(xml: &str) -> Vec<FeedItem> {
    let Some(re) = FeedRegex::get() else {
        return Vec::new();
    };
    re.item
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .filter_map(|m| {
            let item = parse_item(m.as_str());
            if item.is_none() {
                debug!("Feed item is missing a title or url, skipping it");
            }
            item
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
}

impl Default for FeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedClient {
    /// Creates a client with a 30-second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
            .expect("Failed to create FeedClient with default timeout")
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(crate::USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>> {
        let xml = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_feed(&xml))
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:torrent="http://xmlns.ezrss.it/0.1/">
<channel>
  <title>TV Torrents</title>
  <item>
    <title>Show.Name.S05E07.720p.HDTV.x264-GRP</title>
    <link>https://tracker.invalid/details/1</link>
    <enclosure url="https://tracker.invalid/get/1.torrent?a=1&amp;b=2" type="application/x-bittorrent" />
    <pubDate>Tue, 23 Nov 2010 20:00:00 +0000</pubDate>
  </item>
  <item>
    <title><![CDATA[Law &amp; Order/SVU.S12E05.HDTV.XviD-LOL]]></title>
    <torrent:magnetURI><![CDATA[magnet:?xt=urn:btih:abcdef]]></torrent:magnetURI>
  </item>
  <item>
    <title>No url here</title>
  </item>
</channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let items = parse_feed(FEED);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "Show.Name.S05E07.720p.HDTV.x264-GRP");
        assert_eq!(items[0].url, "https://tracker.invalid/get/1.torrent?a=1&b=2");
        assert_eq!(
            items[0].published.map(|d| d.to_rfc3339()),
            Some("2010-11-23T20:00:00+00:00".to_string())
        );
        assert!(!items[0].is_magnet());

        assert_eq!(items[1].title, "Law & Order SVU.S12E05.HDTV.XviD-LOL");
        assert!(items[1].is_magnet());
        assert!(items[1].published.is_none());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_feed("not xml at all").is_empty());
    }
}
