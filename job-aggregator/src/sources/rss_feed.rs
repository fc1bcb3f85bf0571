use super::BoardSweep;
use crate::config::{default_feeds, FeedSpec};
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::SourceAdapter;
use crate::types::{RawRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Remote-job RSS/Atom feeds
pub struct RssFeedSource {
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
    feeds: Vec<FeedSpec>,
}

impl RssFeedSource {
    pub fn new(fetcher: Arc<Fetcher>, feeds: Vec<FeedSpec>) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
            feeds,
        }
    }

    pub fn with_default_feeds(fetcher: Arc<Fetcher>) -> Self {
        Self::new(fetcher, default_feeds())
    }

    async fn fetch_feed(&self, feed: &FeedSpec) -> Result<Vec<RawRecord>> {
        let content = self.fetcher.fetch_text(&feed.url).await?;
        let entries = self.parser.parse_entries(&feed.name, &content)?;
        Ok(entries.into_iter().map(RawRecord::Rss).collect())
    }
}

#[async_trait]
impl SourceAdapter for RssFeedSource {
    fn source_id(&self) -> String {
        "rss".to_string()
    }

    fn source_name(&self) -> String {
        "RSS feeds".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut sweep = BoardSweep::default();

        for feed in &self.feeds {
            match self.fetch_feed(feed).await {
                Ok(records) => {
                    info!("RSS: {} - {} entries", feed.name, records.len());
                    sweep.succeeded(records);
                }
                Err(e) => sweep.failed("rss", &feed.name, &e),
            }
        }

        sweep.finish("rss")
    }
}
