use crate::traits::JobStore;
use crate::types::{JobRecord, Result, StoreStats, UpsertOutcome};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres, Row};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const CREATE_JOBS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS intern_jobs (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        company TEXT NOT NULL,
        location TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        description TEXT,
        posted_date DATE,
        scraped_date DATE NOT NULL,
        source TEXT NOT NULL,
        salary TEXT,
        relevance_score BIGINT NOT NULL DEFAULT 0,
        score_breakdown JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_ANNOUNCEMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS job_announcements (
        job_id TEXT NOT NULL REFERENCES intern_jobs(id) ON DELETE CASCADE,
        channel_id TEXT NOT NULL,
        announced_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (job_id, channel_id)
    )
"#;

/// Postgres-backed job store
pub struct PgJobStore {
    db: Pool<Postgres>,
}

impl PgJobStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;
        Ok(Self { db })
    }

    /// Create the tables if this database has never seen a run
    pub async fn setup_schema(&self) -> Result<()> {
        sqlx::query(CREATE_JOBS_TABLE).execute(&self.db).await?;
        sqlx::query(CREATE_ANNOUNCEMENTS_TABLE).execute(&self.db).await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_intern_jobs_posted_date ON intern_jobs (posted_date)")
            .execute(&self.db)
            .await?;

        info!("Job store schema ready");
        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn upsert_job(&self, job: &JobRecord) -> Result<UpsertOutcome> {
        // scraped_date keeps the first sighting
        let result = sqlx::query(
            r#"
            INSERT INTO intern_jobs (id, title, company, location, url, description, posted_date,
                                     scraped_date, source, salary, relevance_score, score_breakdown)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                company = EXCLUDED.company,
                location = EXCLUDED.location,
                url = EXCLUDED.url,
                description = EXCLUDED.description,
                posted_date = EXCLUDED.posted_date,
                source = EXCLUDED.source,
                salary = EXCLUDED.salary,
                relevance_score = EXCLUDED.relevance_score,
                score_breakdown = EXCLUDED.score_breakdown,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&job.id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.url)
        .bind(&job.description)
        .bind(job.posted_date)
        .bind(job.scraped_date)
        .bind(job.source.as_str())
        .bind(&job.salary)
        .bind(job.relevance_score)
        .bind(Json(job.score_breakdown.as_map()))
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(row) => {
                let inserted: bool = row.try_get("inserted")?;
                debug!("Stored {} ({})", job.id, if inserted { "new" } else { "updated" });
                Ok(if inserted {
                    UpsertOutcome::Inserted
                } else {
                    UpsertOutcome::Updated
                })
            }
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                warn!("Url of {} already stored under another id: {}", job.id, job.url);
                Ok(UpsertOutcome::UrlConflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn is_announced(&self, job_id: &str, channel_id: &str) -> Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM job_announcements WHERE job_id = $1 AND channel_id = $2) AS announced",
        )
        .bind(job_id)
        .bind(channel_id)
        .fetch_one(&self.db)
        .await?;

        Ok(row.try_get("announced")?)
    }

    async fn record_announcement(&self, job_id: &str, channel_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_announcements (job_id, channel_id)
            VALUES ($1, $2)
            ON CONFLICT (job_id, channel_id) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(channel_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn stats(&self, today: NaiveDate) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM intern_jobs) AS total_jobs,
                (SELECT COUNT(*) FROM intern_jobs WHERE posted_date = $1) AS jobs_posted_today,
                (SELECT COUNT(*) FROM intern_jobs WHERE scraped_date = $1) AS jobs_scraped_today,
                (SELECT COUNT(*) FROM job_announcements) AS total_announcements
            "#,
        )
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        Ok(StoreStats {
            total_jobs: row.try_get("total_jobs")?,
            jobs_posted_today: row.try_get("jobs_posted_today")?,
            jobs_scraped_today: row.try_get("jobs_scraped_today")?,
            total_announcements: row.try_get("total_announcements")?,
        })
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    jobs: HashMap<String, JobRecord>,
    url_owners: HashMap<String, String>,
    announcements: HashSet<(String, String)>,
}

/// Process-local store with the same contract as the Postgres one.
///
/// Announcements recorded here are forgotten when the process exits.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: RwLock<MemoryState>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored jobs, ordered by id
    pub async fn jobs(&self) -> Vec<JobRecord> {
        let state = self.state.read().await;
        let mut jobs: Vec<JobRecord> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert_job(&self, job: &JobRecord) -> Result<UpsertOutcome> {
        let mut state = self.state.write().await;

        if let Some(owner) = state.url_owners.get(&job.url) {
            if owner != &job.id {
                warn!("Url of {} already stored under {}: {}", job.id, owner, job.url);
                return Ok(UpsertOutcome::UrlConflict);
            }
        }

        let previous = state.jobs.get(&job.id).map(|j| (j.url.clone(), j.scraped_date));
        let mut stored = job.clone();
        let outcome = match previous {
            Some((previous_url, first_seen)) => {
                stored.scraped_date = first_seen;
                state.url_owners.remove(&previous_url);
                UpsertOutcome::Updated
            }
            None => UpsertOutcome::Inserted,
        };

        state.url_owners.insert(job.url.clone(), job.id.clone());
        state.jobs.insert(job.id.clone(), stored);
        Ok(outcome)
    }

    async fn is_announced(&self, job_id: &str, channel_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .announcements
            .contains(&(job_id.to_string(), channel_id.to_string())))
    }

    async fn record_announcement(&self, job_id: &str, channel_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .announcements
            .insert((job_id.to_string(), channel_id.to_string())))
    }

    async fn stats(&self, today: NaiveDate) -> Result<StoreStats> {
        let state = self.state.read().await;
        Ok(StoreStats {
            total_jobs: state.jobs.len() as i64,
            jobs_posted_today: state.jobs.values().filter(|j| j.posted_date == Some(today)).count() as i64,
            jobs_scraped_today: state.jobs.values().filter(|j| j.scraped_date == today).count() as i64,
            total_announcements: state.announcements.len() as i64,
        })
    }

    fn is_durable(&self) -> bool {
        false
    }
}
