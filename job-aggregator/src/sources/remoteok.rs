use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{RawRecord, RemoteOkJob, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub const REMOTEOK_API_URL: &str = "https://remoteok.com/api";

/// RemoteOK public API, narrowed to one tag
pub struct RemoteOkSource {
    fetcher: Arc<Fetcher>,
    api_url: String,
    tag: Option<String>,
}

impl RemoteOkSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            api_url: REMOTEOK_API_URL.to_string(),
            tag: Some("design".to_string()),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// `None` keeps every listing regardless of tags
    pub fn with_tag(mut self, tag: Option<String>) -> Self {
        self.tag = tag.map(|t| t.to_lowercase());
        self
    }

    fn matches_tag(&self, job: &RemoteOkJob) -> bool {
        match &self.tag {
            Some(tag) => job.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            None => true,
        }
    }
}

#[async_trait]
impl SourceAdapter for RemoteOkSource {
    fn source_id(&self) -> String {
        "remoteok".to_string()
    }

    fn source_name(&self) -> String {
        "RemoteOK".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let listings: Vec<serde_json::Value> = self.fetcher.fetch_json(&self.api_url).await?;
        let total = listings.len();

        let mut records = Vec::new();
        for listing in listings {
            // The first element is a legal notice, not a job
            if listing.get("legal").is_some() {
                continue;
            }
            match serde_json::from_value::<RemoteOkJob>(listing) {
                Ok(job) if self.matches_tag(&job) => records.push(RawRecord::RemoteOk(job)),
                Ok(_) => {}
                Err(e) => debug!("Skipping unreadable RemoteOK listing: {}", e),
            }
        }

        info!("RemoteOK: {} of {} listings tagged {:?}", records.len(), total, self.tag);
        Ok(records)
    }
}
