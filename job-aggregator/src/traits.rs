use crate::types::{JobRecord, RawRecord, Result, StoreStats, UpsertOutcome};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A job board or feed the pipeline can pull listings from
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier, also used as the id prefix of normalized records
    fn source_id(&self) -> String;

    /// Human-readable name for this source
    fn source_name(&self) -> String;

    /// Fetch every listing currently on the source.
    ///
    /// Errors only when nothing could be fetched at all.
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
}

/// Durable home for published listings and their announcements
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or refresh a listing keyed by its id.
    ///
    /// A listing whose url already belongs to a different id is reported as
    /// `UrlConflict` and left untouched.
    async fn upsert_job(&self, job: &JobRecord) -> Result<UpsertOutcome>;

    async fn is_announced(&self, job_id: &str, channel_id: &str) -> Result<bool>;

    /// Returns false when the announcement was already recorded.
    async fn record_announcement(&self, job_id: &str, channel_id: &str) -> Result<bool>;

    async fn stats(&self, today: NaiveDate) -> Result<StoreStats>;

    /// Whether announcements recorded here survive the process.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Pushes listings to a chat channel
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, job: &JobRecord, channel_id: &str) -> Result<()>;

    async fn announce_summary(&self, summary: &RunSummary, channel_id: &str) -> Result<()>;

    /// Report a run that could not complete
    async fn announce_error(&self, message: &str, channel_id: &str) -> Result<()>;
}

/// End-of-run numbers for the daily channel reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_date: NaiveDate,
    pub new_jobs: usize,
    pub stats: StoreStats,
}
