use super::BoardSweep;
use crate::config::CompanyBoard;
use crate::fetcher::Fetcher;
use crate::traits::SourceAdapter;
use crate::types::{RawRecord, Result, WorkableAccount};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub const WORKABLE_API_BASE: &str = "https://apply.workable.com";

/// Workable account widgets of the tracked companies
pub struct WorkableSource {
    fetcher: Arc<Fetcher>,
    boards: Vec<(String, String)>,
    base_url: String,
}

impl WorkableSource {
    pub fn new(fetcher: Arc<Fetcher>, companies: &[CompanyBoard]) -> Self {
        let boards = companies
            .iter()
            .filter_map(|c| c.workable.as_ref().map(|handle| (c.name.clone(), handle.clone())))
            .collect();

        Self {
            fetcher,
            boards,
            base_url: WORKABLE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    fn account_url(&self, handle: &str) -> String {
        format!("{}/api/v1/widget/accounts/{}?details=true", self.base_url, handle)
    }
}

#[async_trait]
impl SourceAdapter for WorkableSource {
    fn source_id(&self) -> String {
        "workable".to_string()
    }

    fn source_name(&self) -> String {
        "Workable".to_string()
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut sweep = BoardSweep::default();

        for (company, handle) in &self.boards {
            match self.fetcher.fetch_json::<WorkableAccount>(&self.account_url(handle)).await {
                Ok(account) => {
                    info!("Workable: {} - {} jobs found", company, account.jobs.len());
                    sweep.succeeded(account.jobs.into_iter().map(|mut job| {
                        job.company_name = company.clone();
                        if job.url.is_none() {
                            job.url = job
                                .shortcode
                                .as_ref()
                                .map(|code| format!("https://apply.workable.com/{}/j/{}/", handle, code));
                        }
                        RawRecord::Workable(job)
                    }));
                }
                Err(e) => sweep.failed("workable", company, &e),
            }
        }

        sweep.finish("workable")
    }
}
