use crate::types::{Entry, IndexerError, Result};
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

const RFC2822: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Extracts pipeline entries from RSS, Atom or JSON Feed documents.
pub struct FeedParser;

impl FeedParser {
    pub fn parse_entries(content: &str) -> Result<Vec<Entry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| IndexerError::Parse(format!("Failed to parse feed: {}", e)))?;

        let total = feed.entries.len();
        let raw_dates = match raw_dates(content) {
            Some(dates) if dates.len() == total => Some(dates),
            _ => {
                debug!("Raw entry dates unavailable, using parsed timestamps");
                None
            }
        };

        let mut raw_dates = raw_dates.map(Vec::into_iter);
        let entries: Vec<Entry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let raw = raw_dates.as_mut().and_then(Iterator::next);
                Self::parse_entry(entry, raw)
            })
            .collect();

        if entries.len() < total {
            debug!("Dropped {} entries without a title or link", total - entries.len());
        }
        Ok(entries)
    }

    /// `raw_date` is the entry's date text exactly as the feed wrote it.
    fn parse_entry(entry: feed_rs::model::Entry, raw_date: Option<String>) -> Option<Entry> {
        let title = entry.title.map(|t| t.content.trim().to_string())?;
        if title.is_empty() {
            return None;
        }
        let link = entry.links.first()?.href.clone();

        let published = match raw_date {
            Some(raw) => raw,
            None => entry
                .published
                .or(entry.updated)
                .map(|dt| dt.format(RFC2822).to_string())
                .unwrap_or_default(),
        };

        let summary = entry.summary.map(|s| s.content).unwrap_or_default();

        Some(Entry {
            title,
            link,
            published,
            summary,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DateField {
    Published,
    Updated,
}

fn date_field(name: &[u8]) -> Option<DateField> {
    match name {
        b"pubDate" | b"published" | b"date" | b"issued" => Some(DateField::Published),
        b"updated" | b"modified" => Some(DateField::Updated),
        _ => None,
    }
}

fn is_entry(name: &[u8]) -> bool {
    name == b"item" || name == b"entry"
}

/// Publish date text of every `item`/`entry` in document order, falling back to the updated
/// date and then to an empty string. `None` when the document is not XML.
///
/// feed-rs only exposes the parsed UTC timestamp, which loses both unparseable dates and the
/// local day of offset dates.
fn raw_dates(content: &str) -> Option<Vec<String>> {
    let mut reader = Reader::from_str(content);
    let mut dates = Vec::new();

    let mut depth = 0usize;
    let mut entry_depth: Option<usize> = None;
    let mut field: Option<DateField> = None;
    let mut text = String::new();
    let mut published: Option<String> = None;
    let mut updated: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match entry_depth {
                    None if is_entry(name.as_ref()) => {
                        entry_depth = Some(depth);
                        published = None;
                        updated = None;
                    }
                    Some(d) if depth == d + 1 => {
                        field = date_field(name.as_ref());
                        text.clear();
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if entry_depth.is_none() && is_entry(e.local_name().as_ref()) {
                    dates.push(String::new());
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                match (field.take(), entry_depth) {
                    (Some(found), Some(d)) if depth == d + 1 => {
                        let value = text.trim();
                        let slot = match found {
                            DateField::Published => &mut published,
                            DateField::Updated => &mut updated,
                        };
                        if slot.is_none() && !value.is_empty() {
                            *slot = Some(value.to_string());
                        }
                    }
                    (_, Some(d)) if depth == d => {
                        dates.push(published.take().or_else(|| updated.take()).unwrap_or_default());
                        entry_depth = None;
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Feed is not XML ({}), skipping raw date scan", e);
                return None;
            }
            _ => {}
        }
    }
    Some(dates)
}
