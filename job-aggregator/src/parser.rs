use crate::types::{AggregatorError, Result, RssEntry};
use feed_rs::parser;
use tracing::{debug, info};

/// Turns RSS/Atom documents into raw feed entries
#[derive(Debug, Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_entries(&self, feed_name: &str, content: &str) -> Result<Vec<RssEntry>> {
        debug!("Parsing {} feed ({} bytes)", feed_name, content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| AggregatorError::Parse(format!("Failed to parse {} feed: {}", feed_name, e)))?;

        let entries: Vec<RssEntry> = feed
            .entries
            .into_iter()
            .map(|entry| self.parse_entry(feed_name, entry))
            .collect();

        info!("Parsed {} feed with {} entries", feed_name, entries.len());
        Ok(entries)
    }

    fn parse_entry(&self, feed_name: &str, entry: feed_rs::model::Entry) -> RssEntry {
        let guid = if entry.id.is_empty() { None } else { Some(entry.id.clone()) };

        // Full content beats the summary when a feed ships both
        let summary = entry
            .content
            .and_then(|content| content.body)
            .or_else(|| entry.summary.map(|s| s.content));

        RssEntry {
            feed_name: feed_name.to_string(),
            guid,
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|link| link.href.clone()),
            author: entry.authors.first().map(|person| person.name.clone()),
            summary,
            published: entry.published.or(entry.updated),
            categories: entry.categories.into_iter().map(|c| c.term).collect(),
        }
    }
}
