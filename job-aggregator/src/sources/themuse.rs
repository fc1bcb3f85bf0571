use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{MusePage, RawRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

pub const THEMUSE_API_URL: &str = "https://www.themuse.com/api/public/jobs";
const DEFAULT_MAX_PAGES: u32 = 5;

/// The Muse public jobs API, filtered by category and level
pub struct TheMuseSource {
    fetcher: Arc<Fetcher>,
    api_url: String,
    category: String,
    level: String,
    api_key: Option<String>,
    max_pages: u32,
}

impl TheMuseSource {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            api_url: THEMUSE_API_URL.to_string(),
            category: "Design".to_string(),
            level: "Internship".to_string(),
            api_key: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Keyed requests get a higher rate limit; the API also answers without one
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn page_url(&self, page: u32) -> Result<String> {
        let mut params = vec![
            ("category", self.category.clone()),
            ("level", self.level.clone()),
            ("page", page.to_string()),
            ("descending", "true".to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        Ok(Url::parse_with_params(&self.api_url, &params)?.to_string())
    }
}

#[async_trait]
impl SourceAdapter for TheMuseSource {
    fn source_id(&self) -> String {
        "themuse".to_string()
    }

    fn source_name(&self) -> String {
        "The Muse".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();

        for page in 0..self.max_pages {
            let body = match self.fetcher.fetch_json::<MusePage>(&self.page_url(page)?).await {
                Ok(body) => body,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!("The Muse: keeping {} jobs, page {} failed: {}", records.len(), page, e);
                    break;
                }
            };

            if body.results.is_empty() {
                break;
            }
            records.extend(body.results.into_iter().map(RawRecord::TheMuse));

            if page + 1 >= body.page_count.unwrap_or(0) {
                break;
            }
        }

        info!("The Muse: {} {} {} jobs found", records.len(), self.category, self.level);
        Ok(records)
    }
}
