use super::BoardSweep;
use crate::config::CompanyBoard;
use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{LeverPosting, RawRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const LEVER_API_BASE: &str = "https://api.lever.co";

/// Public Lever postings of the tracked companies
pub struct LeverSource {
    fetcher: Arc<Fetcher>,
    boards: Vec<(String, String)>,
    base_url: String,
}

impl LeverSource {
    pub fn new(fetcher: Arc<Fetcher>, companies: &[CompanyBoard]) -> Self {
        let boards = companies
            .iter()
            .filter_map(|c| c.lever.as_ref().map(|handle| (c.name.clone(), handle.clone())))
            .collect();

        Self {
            fetcher,
            boards,
            base_url: LEVER_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    fn postings_url(&self, handle: &str) -> String {
        format!("{}/v0/postings/{}?mode=json", self.base_url, handle)
    }
}

#[async_trait]
impl SourceAdapter for LeverSource {
    fn source_id(&self) -> String {
        "lever".to_string()
    }

    fn source_name(&self) -> String {
        "Lever".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut sweep = BoardSweep::default();

        for (company, handle) in &self.boards {
            match self.fetcher.fetch_json::<Vec<LeverPosting>>(&self.postings_url(handle)).await {
                Ok(postings) => {
                    info!("Lever: {} - {} jobs found", company, postings.len());
                    sweep.succeeded(postings.into_iter().map(|mut posting| {
                        posting.company_name = company.clone();
                        RawRecord::Lever(posting)
                    }));
                }
                Err(e) => sweep.failed("lever", company, &e),
            }
        }

        sweep.finish("lever")
    }
}
