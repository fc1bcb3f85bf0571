use super::BoardSweep;
use crate::config::CompanyBoard;
use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{GreenhouseBoard, RawRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const GREENHOUSE_API_BASE: &str = "https://boards-api.greenhouse.io";

/// Public Greenhouse job boards of the tracked companies
pub struct GreenhouseSource {
    fetcher: Arc<Fetcher>,
    boards: Vec<(String, String)>,
    base_url: String,
}

impl GreenhouseSource {
    pub fn new(fetcher: Arc<Fetcher>, companies: &[CompanyBoard]) -> Self {
        let boards = companies
            .iter()
            .filter_map(|c| c.greenhouse.as_ref().map(|handle| (c.name.clone(), handle.clone())))
            .collect();

        Self {
            fetcher,
            boards,
            base_url: GREENHOUSE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    fn board_url(&self, handle: &str) -> String {
        format!("{}/v1/boards/{}/jobs?content=true", self.base_url, handle)
    }
}

#[async_trait]
impl SourceAdapter for GreenhouseSource {
    fn source_id(&self) -> String {
        "greenhouse".to_string()
    }

    fn source_name(&self) -> String {
        "Greenhouse".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut sweep = BoardSweep::default();

        for (company, handle) in &self.boards {
            match self.fetcher.fetch_json::<GreenhouseBoard>(&self.board_url(handle)).await {
                Ok(board) => {
                    info!("Greenhouse: {} - {} jobs found", company, board.jobs.len());
                    sweep.succeeded(board.jobs.into_iter().map(|mut job| {
                        job.company_name = company.clone();
                        RawRecord::Greenhouse(job)
                    }));
                }
                Err(e) => sweep.failed("greenhouse", company, &e),
            }
        }

        sweep.finish("greenhouse")
    }
}
