use super::BoardSweep;
use crate::config::CompanyBoard;
use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{AshbyBoard, RawRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const ASHBY_API_BASE: &str = "https://api.ashbyhq.com";

/// Public Ashby job boards of the tracked companies
pub struct AshbySource {
    fetcher: Arc<Fetcher>,
    boards: Vec<(String, String)>,
    base_url: String,
}

impl AshbySource {
    pub fn new(fetcher: Arc<Fetcher>, companies: &[CompanyBoard]) -> Self {
        let boards = companies
            .iter()
            .filter_map(|c| c.ashby.as_ref().map(|handle| (c.name.clone(), handle.clone())))
            .collect();

        Self {
            fetcher,
            boards,
            base_url: ASHBY_API_BASE.to_string(),
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
        format!("{}/posting-api/job-board/{}", self.base_url, handle)
    }
}

#[async_trait]
impl SourceAdapter for AshbySource {
    fn source_id(&self) -> String {
        "ashby".to_string()
    }

    fn source_name(&self) -> String {
        "Ashby".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut sweep = BoardSweep::default();

        for (company, handle) in &self.boards {
            match self.fetcher.fetch_json::<AshbyBoard>(&self.board_url(handle)).await {
                Ok(board) => {
                    info!("Ashby: {} - {} jobs found", company, board.jobs.len());
                    sweep.succeeded(board.jobs.into_iter().map(|mut job| {
                        job.company_name = company.clone();
                        if job.job_url.is_none() {
                            job.job_url = job
                                .id
                                .as_ref()
                                .map(|id| format!("https://jobs.ashbyhq.com/{}/{}", handle, id));
                        }
                        RawRecord::Ashby(job)
                    }));
                }
                Err(e) => sweep.failed("ashby", company, &e),
            }
        }

        sweep.finish("ashby")
    }
}
