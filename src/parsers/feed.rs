use feed_rs::model::Entry;
use feed_rs::parser::{self, ParseFeedError};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::models::ListingRow;

/// The entry fields the listing rows are built from, independent of the
/// feed parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// RSS `<description>` / Atom `<summary>`.
    pub description: Option<String>,
    /// Full content body, used when there is no description.
    pub content: Option<String>,
    /// RFC 2822, the way RSS feeds carry `pubDate`. A date the parser
    /// cannot read is kept as written.
    pub published: Option<String>,
}

impl From<Entry> for FeedEntry {
    fn from(entry: Entry) -> Self {
        Self {
            title: entry.title.map(|t| t.content),
            link: entry.links.into_iter().next().map(|l| l.href),
            description: entry.summary.map(|t| t.content),
            content: entry.content.and_then(|c| c.body),
            published: entry.published.map(|d| d.to_rfc2822()),
        }
    }
}

pub fn parse_entries(body: &str) -> Result<Vec<FeedEntry>, ParseFeedError> {
    let feed = parser::parse(body.as_bytes())?;
    let raw_dates = raw_item_dates(body);

    Ok(feed
        .entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut entry = FeedEntry::from(entry);
            if entry.published.is_none() {
                entry.published = raw_dates.get(index).cloned().flatten();
            }
            entry
        })
        .collect())
}

/// `pubDate` text of every RSS `<item>` in document order, `None` for items
/// without one.
fn raw_item_dates(body: &str) -> Vec<Option<String>> {
    let mut reader = Reader::from_str(body);
    reader.trim_text(true);

    let mut dates: Vec<Option<String>> = Vec::new();
    let mut in_item = false;
    let mut in_date = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = true;
                    dates.push(None);
                }
                b"pubDate" if in_item => in_date = true,
                _ => {}
            },
            Ok(Event::Text(t)) if in_date => {
                if let (Some(slot), Ok(text)) = (dates.last_mut(), t.unescape()) {
                    *slot = Some(text.trim().to_string());
                }
            }
            Ok(Event::CData(c)) if in_date => {
                if let Some(slot) = dates.last_mut() {
                    *slot = Some(String::from_utf8_lossy(&c).trim().to_string());
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" => {
                    in_item = false;
                    in_date = false;
                }
                b"pubDate" => in_date = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    dates
}

/// Non-empty means: parses as a feed and has at least one entry.
pub fn has_entries(body: &str) -> bool {
    parse_entries(body)
        .map(|entries| !entries.is_empty())
        .unwrap_or(false)
}

/// One row per entry, in feed order. Absent fields become empty strings.
pub fn extract_feed(entries: &[FeedEntry]) -> Vec<ListingRow> {
    entries
        .iter()
        .map(|entry| {
            ListingRow::feed(
                entry.title.clone().unwrap_or_default(),
                entry.link.clone().unwrap_or_default(),
                entry
                    .description
                    .clone()
                    .or_else(|| entry.content.clone())
                    .unwrap_or_default(),
                entry.published.clone().unwrap_or_default(),
            )
        })
        .collect()
}
